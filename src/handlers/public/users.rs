// handlers/public/users.rs - POST /api/users handler

use axum::extract::State;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::user_service::RegisterInput;
use crate::state::AppState;

use super::session::TokenResponse;

/// POST /api/users - Register a user and receive a token
///
/// Expected Input:
/// ```json
/// { "name": "Ann", "email": "a@x.com", "password": "secret1" }
/// ```
///
/// Fails with 400 and a field list when validation fails or the email is
/// already registered.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> ApiResult<TokenResponse> {
    let registered = state.users.register(input).await?;
    Ok(ApiResponse::success(TokenResponse {
        token: registered.token,
    }))
}
