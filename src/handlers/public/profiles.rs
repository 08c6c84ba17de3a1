// handlers/public/profiles.rs - Anonymous profile reads

use axum::extract::{Path, State};

use crate::middleware::{parse_id, ApiResponse, ApiResult};
use crate::services::profile_service::ProfileView;
use crate::services::GithubRepo;
use crate::state::AppState;
use crate::types::UserId;

/// GET /api/profile - All profiles with their owners
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ProfileView>> {
    let profiles = state.profiles.list_all().await?;
    Ok(ApiResponse::success(profiles))
}

/// GET /api/profile/user/:user_id
pub async fn by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ProfileView> {
    let user_id = UserId::from(parse_id(&user_id, "There is no profile for this user")?);
    let profile = state.profiles.get_by_user(user_id).await?;
    Ok(ApiResponse::success(profile))
}

/// GET /api/profile/github/:username - The user's latest public repositories
pub async fn github_repos(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Vec<GithubRepo>> {
    let repos = state.github.repos(&username).await?;
    Ok(ApiResponse::success(repos))
}
