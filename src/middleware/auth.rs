use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::TokenError;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::UserId;

/// Legacy header some clients send instead of `Authorization: Bearer`.
pub const LEGACY_TOKEN_HEADER: &str = "x-auth-token";

/// Authenticated user context extracted from JWT
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuthUser {
    pub user_id: UserId,
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("No token, authorization denied"))?;

    let claims = state.tokens.verify(token).map_err(|e| {
        match e {
            TokenError::Expired => tracing::debug!("Rejected expired token"),
            _ => tracing::debug!("Rejected token: {}", e),
        }
        ApiError::unauthorized("Token is not valid")
    })?;

    request.extensions_mut().insert(AuthUser { user_id: claims.sub });

    Ok(next.run(request).await)
}

/// Bearer token from `Authorization`, falling back to the legacy header.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    bearer
        .or_else(|| {
            headers
                .get(LEGACY_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .filter(|t| !t.is_empty())
}
