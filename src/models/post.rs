//! Post model
//!
//! This module provides:
//! - `Post` entity as persisted by the store
//! - Input types for creating and partially updating posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, TagSet};

/// Number of characters shown on a feed card before truncation
pub const EXCERPT_CHARS: usize = 150;

/// Post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier, assigned by the store
    pub id: i64,
    /// Post title (never empty)
    pub title: String,
    /// Free-form body
    #[serde(default)]
    pub content: String,
    /// Optional image URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// Tags, in the order the author added them
    #[serde(default)]
    pub tags: TagSet,
    /// Cheer (upvote) count
    #[serde(default)]
    pub cheer_count: u32,
    /// Number of comments, computed when the feed is fetched.
    /// Not authoritative; change events carry 0.
    #[serde(default)]
    pub comment_count: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Body preview for feed cards
    pub fn excerpt(&self) -> String {
        if self.content.chars().count() > EXCERPT_CHARS {
            let head: String = self.content.chars().take(EXCERPT_CHARS).collect();
            format!("{}...", head)
        } else {
            self.content.clone()
        }
    }

    /// Case-insensitive substring match against the title
    pub fn title_contains(&self, term: &str) -> bool {
        self.title.to_lowercase().contains(&term.to_lowercase())
    }
}

impl Record for Post {
    const TABLE: &'static str = "posts";

    fn id(&self) -> i64 {
        self.id
    }
}

/// Input for creating a new post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: TagSet,
    /// Explicit creation timestamp; the store stamps `now` when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CreatePostInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Partial update for an existing post.
///
/// Only fields set to `Some` are written; everything else is left as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` clears the image
    pub image_url: Option<Option<String>>,
    pub tags: Option<TagSet>,
    pub cheer_count: Option<u32>,
}

impl UpdatePostInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = Some(image_url);
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_cheer_count(mut self, cheer_count: u32) -> Self {
        self.cheer_count = Some(cheer_count);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.content.is_some()
            || self.image_url.is_some()
            || self.tags.is_some()
            || self.cheer_count.is_some()
    }

    /// Merge the set fields into `post`
    pub fn apply_to(&self, post: &mut Post) {
        if let Some(ref title) = self.title {
            post.title = title.clone();
        }
        if let Some(ref content) = self.content {
            post.content = content.clone();
        }
        if let Some(ref image_url) = self.image_url {
            post.image_url = image_url.clone();
        }
        if let Some(ref tags) = self.tags {
            post.tags = tags.clone();
        }
        if let Some(cheer_count) = self.cheer_count {
            post.cheer_count = cheer_count;
        }
    }
}
