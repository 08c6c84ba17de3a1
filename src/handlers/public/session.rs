// handlers/public/session.rs - POST /api/auth handler

use axum::extract::State;
use serde::Serialize;

use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::services::user_service::LoginInput;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/auth - Exchange email and password for a token
///
/// Unknown email and wrong password both yield 401 "Invalid Credentials".
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<TokenResponse> {
    let token = state.users.login(input).await?;
    Ok(ApiResponse::success(TokenResponse { token }))
}
