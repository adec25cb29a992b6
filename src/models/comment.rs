//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Record;

/// Comment entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    /// Parent post; a comment lives and dies with it
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Comment {
    const TABLE: &'static str = "comments";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Input for creating a comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CreateCommentInput {
    pub fn new(post_id: i64, author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            post_id,
            author: author.into(),
            content: content.into(),
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Partial update for a comment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateCommentInput {
    pub author: Option<String>,
    pub content: Option<String>,
}

impl UpdateCommentInput {
    pub fn apply_to(&self, comment: &mut Comment) {
        if let Some(ref author) = self.author {
            comment.author = author.clone();
        }
        if let Some(ref content) = self.content {
            comment.content = content.clone();
        }
    }
}
