//! View models
//!
//! Screen state kept consistent with the remote collection:
//! - [`FeedViewModel`]: all posts, the filtered and sorted projection, criteria
//! - [`DetailViewModel`]: one post and its comments
//! - [`PostComposer`]: the creation form
//!
//! Each view model owns its subscriptions. Events are applied one at a time
//! through `&mut self`, so no locking is involved; the consumer drives the
//! event loop with `process_next` (or `next_change` + `apply`).

mod compose;
mod context;
mod detail;
pub mod fallback;
mod feed;
pub mod format;
pub mod projection;

pub use compose::{PostComposer, PostDraft};
pub use context::SessionContext;
pub use detail::{DetailChange, DetailViewModel};
pub use feed::FeedViewModel;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::models::Post;

/// Error types for view operations
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// Input rejected before anything was sent to the backend
    #[error("Validation error: {0}")]
    ValidationRejected(String),

    /// The operation needs a loaded post
    #[error("Nothing loaded")]
    NotLoaded,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Where the consumer should go next. Signaled, never performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Feed,
    PostDetail(i64),
}

/// Render-ready feed entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub cheer_count: u32,
    pub comment_count: u32,
    /// Relative age, e.g. "2h ago"
    pub age: String,
}

impl PostCard {
    pub fn from_post(post: &Post, now: DateTime<Utc>) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: post.excerpt(),
            image_url: post.image_url.clone(),
            tags: post.tags.iter().map(str::to_string).collect(),
            cheer_count: post.cheer_count,
            comment_count: post.comment_count,
            age: format::format_relative(post.created_at, now),
        }
    }

    /// Where selecting this card leads
    pub fn target(&self) -> Navigation {
        Navigation::PostDetail(self.id)
    }
}
