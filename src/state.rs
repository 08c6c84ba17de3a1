use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::database::{DocumentStore, Repository};
use crate::services::{GithubClient, PostService, ProfileService, UserService};

/// Shared handles passed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenService,
    pub users: UserService,
    pub profiles: ProfileService,
    pub posts: PostService,
    pub github: GithubClient,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: &AppConfig) -> anyhow::Result<Self> {
        let tokens = TokenService::from_config(&config.security)?;
        let hasher = PasswordHasher::new(config.security.bcrypt_cost);
        let github = GithubClient::new(&config.github)?;
        Ok(Self::from_parts(store, hasher, tokens, github))
    }

    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
        github: GithubClient,
    ) -> Self {
        let users = Repository::new(Arc::clone(&store));
        let profiles = Repository::new(Arc::clone(&store));
        let posts = Repository::new(Arc::clone(&store));

        Self {
            users: UserService::new(users.clone(), hasher, tokens.clone()),
            profiles: ProfileService::new(profiles, users.clone(), posts.clone()),
            posts: PostService::new(posts, users),
            store,
            tokens,
            github,
        }
    }
}
