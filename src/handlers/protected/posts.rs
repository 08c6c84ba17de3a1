// handlers/protected/posts.rs - Posts, likes and comments

use axum::extract::{Extension, Path, State};

use crate::database::models::{Comment, Like, Post};
use crate::middleware::{parse_id, ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::post_service::TextInput;
use crate::state::AppState;

use super::profile::Ack;

const POST_NOT_FOUND: &str = "Post not found";

/// POST /api/posts
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<TextInput>,
) -> ApiResult<Post> {
    let post = state.posts.create(auth.user_id, input.into_text()?).await?;
    Ok(ApiResponse::success(post))
}

/// GET /api/posts - Newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Post>> {
    Ok(ApiResponse::success(state.posts.list().await?))
}

/// GET /api/posts/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Post> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    Ok(ApiResponse::success(state.posts.get(id).await?))
}

/// DELETE /api/posts/:id - Author only
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Ack> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    state.posts.delete(auth.user_id, id).await?;
    Ok(ApiResponse::success(Ack { msg: "Post removed" }))
}

/// PUT /api/posts/like/:id
pub async fn like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Like>> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    Ok(ApiResponse::success(state.posts.like(auth.user_id, id).await?))
}

/// PUT /api/posts/unlike/:id
pub async fn unlike(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Like>> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    Ok(ApiResponse::success(state.posts.unlike(auth.user_id, id).await?))
}

/// POST /api/posts/comment/:id
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<TextInput>,
) -> ApiResult<Vec<Comment>> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    let comments = state
        .posts
        .add_comment(auth.user_id, id, input.into_text()?)
        .await?;
    Ok(ApiResponse::success(comments))
}

/// DELETE /api/posts/comment/:id/:comment_id - Comment author only
pub async fn remove_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((id, comment_id)): Path<(String, String)>,
) -> ApiResult<Vec<Comment>> {
    let id = parse_id(&id, POST_NOT_FOUND)?;
    let comment_id = parse_id(&comment_id, "Comment does not exist")?;
    let comments = state
        .posts
        .remove_comment(auth.user_id, id, comment_id)
        .await?;
    Ok(ApiResponse::success(comments))
}
