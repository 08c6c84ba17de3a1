use chrono::Duration;
use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::GithubConfig;
use crate::database::models::PublicUser;
use crate::database::{MemoryStore, UNIQUE_FIELDS};
use crate::services::user_service::RegisterInput;
use crate::services::GithubClient;
use crate::state::AppState;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "secret1";

/// Application state over a fresh in-memory store with cheap hashing.
pub struct TestContext {
    pub state: AppState,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::with_constraints(UNIQUE_FIELDS));
        let tokens = TokenService::new(TEST_SECRET, Duration::hours(1))
            .expect("test secret is non-empty");
        // Port 9 (discard) so an accidental real request fails fast
        let github = GithubClient::new(&GithubConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            token: None,
            timeout_secs: 1,
        })
        .expect("static github config");

        Self {
            state: AppState::from_parts(store, PasswordHasher::new(4), tokens, github),
        }
    }

    /// Register a user with [`TEST_PASSWORD`] and return it with its token.
    pub async fn register(&self, name: &str, email: &str) -> (PublicUser, String) {
        let registered = self
            .state
            .users
            .register(RegisterInput {
                name: Some(name.to_string()),
                email: Some(email.to_string()),
                password: Some(TEST_PASSWORD.to_string()),
            })
            .await
            .expect("test registration");
        (registered.user, registered.token)
    }
}
