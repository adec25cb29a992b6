//! Data models
//!
//! This module contains the data structures shared by the gateway, the change
//! channel and the view models:
//! - Store entities (Post, Comment)
//! - Input types for create and partial update
//! - Feed criteria (search, category, sort)

mod category;
mod comment;
mod feed;
mod post;
mod tag;

pub use category::Category;
pub use comment::{Comment, CreateCommentInput, UpdateCommentInput};
pub use feed::{FeedCriteria, SortKey};
pub use post::{CreatePostInput, Post, UpdatePostInput, EXCERPT_CHARS};
pub use tag::TagSet;

/// A row of a store table, identified by a store-assigned id.
pub trait Record: Clone + Send + Sync + 'static {
    /// Table the row lives in
    const TABLE: &'static str;

    fn id(&self) -> i64;
}
