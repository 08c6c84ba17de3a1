pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::UserId;

pub use password::{PasswordError, PasswordHasher};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Token verification and issuance failures. The auth gate rejects both
/// `Expired` and `Malformed` as unauthenticated, but logs them apart.
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is malformed or carries an invalid signature")]
    Malformed,

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("token secret is not configured")]
    InvalidSecret,
}

/// Issues and verifies HS256 bearer tokens carrying the user id as subject.
///
/// Tokens are stateless: nothing is persisted and there is no revocation list,
/// so a token stays valid until its `exp` passes.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::InvalidSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, TokenError> {
        Self::new(&security.jwt_secret, Duration::seconds(security.jwt_ttl_seconds))
    }

    /// Issue a token for `user_id` with the configured lifetime.
    pub fn issue(&self, user_id: UserId) -> Result<String, TokenError> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    pub fn issue_with_ttl(&self, user_id: UserId, ttl: Duration) -> Result<String, TokenError> {
        let claims = Claims::new(user_id, ttl);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry, returning the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::seconds(36_000)).unwrap()
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let user = UserId::new();

        let token = tokens.issue(user).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, user);
        assert_eq!(claims.exp - claims.iat, 36_000);
    }

    #[test]
    fn tampered_signature_is_malformed() {
        let tokens = service();
        let token = tokens.issue(UserId::new()).unwrap();

        let signature_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let target = signature_start + 5;
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(tokens.verify(&tampered), Err(TokenError::Malformed));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = service();
        let token = tokens.issue_with_ttl(UserId::new(), Duration::seconds(-10)).unwrap();

        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn token_from_other_secret_is_malformed() {
        let other = TokenService::new("other-secret", Duration::seconds(60)).unwrap();
        let token = other.issue(UserId::new()).unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(service().verify("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(service().verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            TokenService::new("", Duration::seconds(60)),
            Err(TokenError::InvalidSecret)
        ));
    }
}
