use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{PasswordError, PasswordHasher, TokenError, TokenService};
use crate::database::models::{PublicUser, User};
use crate::database::{Repository, StoreError};
use crate::filter::Filter;
use crate::services::avatar::gravatar_url;
use crate::types::UserId;
use crate::validation::{is_valid_email, FieldErrors};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("User already exists")]
    AlreadyExists,

    /// Unknown email and wrong password both end up here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require("name", self.name.as_deref(), "Name is required");
        errors.check(
            self.email.as_deref().is_some_and(is_valid_email),
            "email",
            "Please include a valid email",
        );
        errors.check(
            self.password
                .as_deref()
                .is_some_and(|p| p.chars().count() >= MIN_PASSWORD_LEN),
            "password",
            "Please enter a password with 6 or more characters",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.check(
            self.email.as_deref().is_some_and(is_valid_email),
            "email",
            "Please include a valid email",
        );
        errors.check(
            self.password.as_deref().is_some_and(|p| !p.is_empty()),
            "password",
            "Password is required",
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone)]
pub struct Registered {
    pub user: PublicUser,
    pub token: String,
}

/// Emails are compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account registry: registration, credential checks and lookups.
#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl UserService {
    pub fn new(users: Repository<User>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self { users, hasher, tokens }
    }

    pub async fn register(&self, input: RegisterInput) -> Result<Registered, UserError> {
        input.validate().map_err(UserError::Validation)?;

        let name = input.name.unwrap_or_default().trim().to_string();
        let email = normalize_email(&input.email.unwrap_or_default());
        let password = input.password.unwrap_or_default();

        if self.find_by_email(&email).await?.is_some() {
            warn!("Registration rejected, email already in use");
            return Err(UserError::AlreadyExists);
        }

        let user = User {
            id: UserId::new(),
            name,
            avatar: gravatar_url(&email),
            email,
            password: self.hasher.hash(&password).await?,
            created_at: Utc::now(),
        };

        // The unique index catches a registration racing this one
        let user = self.users.insert(user).await.map_err(|e| match e {
            StoreError::UniqueViolation { .. } => UserError::AlreadyExists,
            other => UserError::Store(other),
        })?;

        let token = self.tokens.issue(user.id)?;
        info!("Registered user {}", user.id);

        Ok(Registered {
            user: user.into(),
            token,
        })
    }

    /// Check credentials and issue a token. Failure does not reveal whether
    /// the email is registered.
    pub async fn login(&self, input: LoginInput) -> Result<String, UserError> {
        input.validate().map_err(UserError::Validation)?;

        let email = normalize_email(input.email.as_deref().unwrap_or_default());
        let password = input.password.unwrap_or_default();

        let Some(user) = self.find_by_email(&email).await? else {
            // Same bcrypt work as a real check so the miss is not measurable
            self.hasher.hash(&password).await?;
            warn!("Login failed: unknown account");
            return Err(UserError::InvalidCredentials);
        };

        if !self.hasher.verify(&password, &user.password).await? {
            warn!("Login failed: bad password for user {}", user.id);
            return Err(UserError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!("User {} logged in", user.id);
        Ok(token)
    }

    pub async fn get_by_id(&self, user_id: UserId) -> Result<PublicUser, UserError> {
        self.users
            .select_id(user_id.as_uuid())
            .await?
            .map(PublicUser::from)
            .ok_or(UserError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.users
            .select_one(Filter::new().where_eq("email", email))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DocumentStore, MemoryStore, UNIQUE_FIELDS};
    use crate::testing::{TestContext, TEST_SECRET};
    use std::sync::Arc;
    use std::time::Instant;

    fn register_input(name: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn register_issues_verifiable_token() {
        let ctx = TestContext::new();
        let registered = ctx
            .state
            .users
            .register(register_input("Ann", "a@x.com", "secret1"))
            .await
            .unwrap();

        let claims = ctx.state.tokens.verify(&registered.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);
        assert_eq!(registered.user.name, "Ann");
        assert!(registered.user.avatar.starts_with("https://www.gravatar.com/avatar/"));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_keeps_first_user() {
        let ctx = TestContext::new();
        let users = &ctx.state.users;
        let first = users.register(register_input("Ann", "a@x.com", "secret1")).await.unwrap();

        let second = users.register(register_input("Other", "A@X.com", "secret2")).await;
        assert!(matches!(second, Err(UserError::AlreadyExists)));

        let stored = users.get_by_id(first.user.id).await.unwrap();
        assert_eq!(stored.name, "Ann");
        assert!(users.login(login_input("a@x.com", "secret1")).await.is_ok());
    }

    #[tokio::test]
    async fn register_validates_before_touching_store() {
        let ctx = TestContext::new();
        let result = ctx
            .state
            .users
            .register(register_input(" ", "not-an-email", "short"))
            .await;

        match result {
            Err(UserError::Validation(errors)) => {
                let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "email", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other.map(|r| r.user)),
        }
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let ctx = TestContext::new();
        let users = &ctx.state.users;
        users.register(register_input("Ann", "a@x.com", "secret1")).await.unwrap();

        let wrong_password = users.login(login_input("a@x.com", "wrong-pass")).await.unwrap_err();
        let unknown_email = users.login(login_input("nobody@x.com", "secret1")).await.unwrap_err();

        assert!(matches!(wrong_password, UserError::InvalidCredentials));
        assert!(matches!(unknown_email, UserError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn unknown_email_costs_as_much_as_wrong_password() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::with_constraints(UNIQUE_FIELDS));
        let tokens = TokenService::new(TEST_SECRET, chrono::Duration::hours(1)).unwrap();
        let users = UserService::new(Repository::new(store), PasswordHasher::new(8), tokens);
        users.register(register_input("Ann", "a@x.com", "secret1")).await.unwrap();

        let started = Instant::now();
        users.login(login_input("a@x.com", "wrong-pass")).await.unwrap_err();
        let wrong_password = started.elapsed();

        let started = Instant::now();
        users.login(login_input("nobody@x.com", "wrong-pass")).await.unwrap_err();
        let unknown_email = started.elapsed();

        // Both pay for a cost-8 bcrypt round; a short-circuit is orders of magnitude faster
        assert!(
            unknown_email * 4 >= wrong_password,
            "unknown email took {:?}, wrong password took {:?}",
            unknown_email,
            wrong_password
        );
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let ctx = TestContext::new();
        let users = &ctx.state.users;
        let registered = users.register(register_input("Ann", "a@x.com", "secret1")).await.unwrap();

        let token = users.login(login_input(" A@X.COM", "secret1")).await.unwrap();
        assert_eq!(ctx.state.tokens.verify(&token).unwrap().sub, registered.user.id);
    }

    #[tokio::test]
    async fn get_by_id_unknown_user() {
        let ctx = TestContext::new();
        let result = ctx.state.users.get_by_id(UserId::new()).await;
        assert!(matches!(result, Err(UserError::NotFound)));
    }
}
