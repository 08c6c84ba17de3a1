// handlers/protected/profile.rs - The caller's own profile
//
// Every handler here acts on the profile owned by the authenticated user;
// entry ids in the path are only looked up inside that profile.

use axum::extract::{Extension, Path, State};
use serde::Serialize;

use crate::middleware::{parse_id, ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::profile_service::{EducationInput, ExperienceInput, ProfileInput, ProfileView};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Ack {
    pub msg: &'static str,
}

/// GET /api/profile/me
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<ProfileView> {
    let profile = state.profiles.get_by_user(auth.user_id).await?;
    Ok(ApiResponse::success(profile))
}

/// POST /api/profile - Create or update; blank fields keep their stored value
pub async fn upsert(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<ProfileInput>,
) -> ApiResult<ProfileView> {
    let profile = state.profiles.upsert(auth.user_id, input).await?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/profile - Remove the account with its profile and posts
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Ack> {
    state.profiles.delete_cascade(auth.user_id).await?;
    Ok(ApiResponse::success(Ack { msg: "User deleted" }))
}

/// PUT /api/profile/experience
pub async fn add_experience(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<ExperienceInput>,
) -> ApiResult<ProfileView> {
    let profile = state.profiles.add_experience(auth.user_id, input).await?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/profile/experience/:exp_id
pub async fn remove_experience(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(exp_id): Path<String>,
) -> ApiResult<ProfileView> {
    let exp_id = parse_id(&exp_id, "Experience entry not found")?;
    let profile = state.profiles.remove_experience(auth.user_id, exp_id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/profile/education
pub async fn add_education(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<EducationInput>,
) -> ApiResult<ProfileView> {
    let profile = state.profiles.add_education(auth.user_id, input).await?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/profile/education/:edu_id
pub async fn remove_education(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(edu_id): Path<String>,
) -> ApiResult<ProfileView> {
    let edu_id = parse_id(&edu_id, "Education entry not found")?;
    let profile = state.profiles.remove_education(auth.user_id, edu_id).await?;
    Ok(ApiResponse::success(profile))
}
