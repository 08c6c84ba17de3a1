use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::repository::Entity;
use crate::types::{timestamp, UserId};

/// A post with its likes and comments. `name` and `avatar` are the author's
/// values when the post was written and are not refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user: UserId,
    pub text: String,
    pub name: String,
    pub avatar: String,
    /// At most one entry per user
    #[serde(default)]
    pub likes: Vec<Like>,
    /// Newest first
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Like {
    pub user: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub user: UserId,
    pub text: String,
    pub name: String,
    pub avatar: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user: UserId) -> bool {
        self.likes.iter().any(|like| like.user == user)
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}

impl Entity for Post {
    const COLLECTION: &'static str = "posts";

    fn id(&self) -> Uuid {
        self.id
    }
}
