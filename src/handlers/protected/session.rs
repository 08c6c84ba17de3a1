// handlers/protected/session.rs - GET /api/auth handler

use axum::extract::{Extension, State};

use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// GET /api/auth - The account behind the presented token, without its
/// password hash
pub async fn whoami(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<PublicUser> {
    let user = state.users.get_by_id(auth.user_id).await?;
    Ok(ApiResponse::success(user))
}
