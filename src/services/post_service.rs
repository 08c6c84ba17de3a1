use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{Comment, Like, Post, User};
use crate::database::{Repository, StoreError};
use crate::filter::{Filter, SortDirection};
use crate::types::UserId;
use crate::validation::{non_blank, FieldErrors};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Post not found")]
    NotFound,

    #[error("Comment does not exist")]
    CommentNotFound,

    #[error("User not authorized")]
    Forbidden,

    #[error("Post already liked")]
    AlreadyLiked,

    #[error("Post has not yet been liked")]
    NotLiked,

    /// The caller's account disappeared after its token was issued.
    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextInput {
    pub text: Option<String>,
}

impl TextInput {
    pub fn into_text(self) -> Result<String, PostError> {
        required_text(self.text.as_deref())
    }
}

fn required_text(text: Option<&str>) -> Result<String, PostError> {
    non_blank(text).ok_or_else(|| PostError::Validation(FieldErrors::single("text", "Text is required")))
}

/// Posts, likes and comments. Every mutation of a post goes through a
/// compare-and-swap so concurrent likes and comments are never lost.
#[derive(Clone)]
pub struct PostService {
    posts: Repository<Post>,
    users: Repository<User>,
}

impl PostService {
    pub fn new(posts: Repository<Post>, users: Repository<User>) -> Self {
        Self { posts, users }
    }

    pub async fn create(&self, user_id: UserId, text: String) -> Result<Post, PostError> {
        let text = required_text(Some(&text))?;
        let author = self.author(user_id).await?;

        let post = Post {
            id: Uuid::new_v4(),
            user: user_id,
            text,
            name: author.name,
            avatar: author.avatar,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: Utc::now(),
        };

        let post = self.posts.insert(post).await?;
        info!("User {} created post {}", user_id, post.id);
        Ok(post)
    }

    /// All posts, newest first.
    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        let filter = Filter::new().order("created_at", SortDirection::Desc);
        Ok(self.posts.select_any(filter).await?)
    }

    pub async fn get(&self, post_id: Uuid) -> Result<Post, PostError> {
        self.posts.select_id(post_id).await?.ok_or(PostError::NotFound)
    }

    pub async fn delete(&self, user_id: UserId, post_id: Uuid) -> Result<(), PostError> {
        let post = self.get(post_id).await?;
        if post.user != user_id {
            return Err(PostError::Forbidden);
        }

        self.posts.delete(post_id).await?;
        info!("User {} deleted post {}", user_id, post_id);
        Ok(())
    }

    /// Record the caller's like, newest first. Returns the updated likes.
    pub async fn like(&self, user_id: UserId, post_id: Uuid) -> Result<Vec<Like>, PostError> {
        let post = self
            .mutate(post_id, |post| {
                if post.is_liked_by(user_id) {
                    return Err(PostError::AlreadyLiked);
                }
                post.likes.insert(0, Like { user: user_id });
                Ok(())
            })
            .await?;
        Ok(post.likes)
    }

    pub async fn unlike(&self, user_id: UserId, post_id: Uuid) -> Result<Vec<Like>, PostError> {
        let post = self
            .mutate(post_id, |post| {
                if !post.is_liked_by(user_id) {
                    return Err(PostError::NotLiked);
                }
                post.likes.retain(|like| like.user != user_id);
                Ok(())
            })
            .await?;
        Ok(post.likes)
    }

    pub async fn add_comment(
        &self,
        user_id: UserId,
        post_id: Uuid,
        text: String,
    ) -> Result<Vec<Comment>, PostError> {
        let text = required_text(Some(&text))?;
        let author = self.author(user_id).await?;

        let comment = Comment {
            id: Uuid::new_v4(),
            user: user_id,
            text,
            name: author.name,
            avatar: author.avatar,
            created_at: Utc::now(),
        };

        let post = self
            .mutate(post_id, |post| {
                post.comments.insert(0, comment.clone());
                Ok(())
            })
            .await?;
        info!("User {} commented on post {}", user_id, post_id);
        Ok(post.comments)
    }

    /// Only the comment's author may remove it.
    pub async fn remove_comment(
        &self,
        user_id: UserId,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Vec<Comment>, PostError> {
        let post = self
            .mutate(post_id, |post| {
                let comment = post.comment(comment_id).ok_or(PostError::CommentNotFound)?;
                if comment.user != user_id {
                    return Err(PostError::Forbidden);
                }
                post.comments.retain(|c| c.id != comment_id);
                Ok(())
            })
            .await?;
        Ok(post.comments)
    }

    async fn mutate<F>(&self, post_id: Uuid, mutate: F) -> Result<Post, PostError>
    where
        F: FnMut(&mut Post) -> Result<(), PostError> + Send,
    {
        self.posts
            .update_with(post_id, mutate)
            .await?
            .ok_or(PostError::NotFound)
    }

    async fn author(&self, user_id: UserId) -> Result<User, PostError> {
        self.users
            .select_id(user_id.as_uuid())
            .await?
            .ok_or(PostError::UserNotFound)
    }
}
