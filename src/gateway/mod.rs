//! Remote collection gateway
//!
//! Contracts for reading and mutating posts and comments in the external
//! store. Implementations normalize every transport or query failure into
//! [`GatewayError::BackendUnavailable`] and report absent rows as
//! [`GatewayError::NotFound`].
//!
//! Callers decide the degradation policy: feed and detail reads fall back to
//! demonstration content, writes surface the failure to the user.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{
    Comment, CreateCommentInput, CreatePostInput, Post, UpdateCommentInput, UpdatePostInput,
};
use crate::realtime::ChangeSource;

/// Error types for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network or query failure
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] anyhow::Error),

    /// The requested row does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },
}

impl GatewayError {
    pub fn post_not_found(id: i64) -> Self {
        Self::NotFound { kind: "Post", id }
    }

    pub fn comment_not_found(id: i64) -> Self {
        Self::NotFound { kind: "Comment", id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Post collection contract
#[async_trait]
pub trait PostGateway: Send + Sync {
    /// All posts, newest first, each annotated with its comment count
    async fn list_all(&self) -> Result<Vec<Post>, GatewayError>;

    /// A single post
    async fn get_by_id(&self, id: i64) -> Result<Post, GatewayError>;

    /// Insert a post; returns it with the store-assigned id and defaults
    async fn create(&self, input: CreatePostInput) -> Result<Post, GatewayError>;

    /// Merge the set fields into the stored post; returns the persisted state
    async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, GatewayError>;

    /// Delete a post and, at the store level, its comments.
    ///
    /// Deleting an id that is already gone reports `NotFound`.
    async fn delete(&self, id: i64) -> Result<(), GatewayError>;

    /// Add one cheer.
    ///
    /// Reads the current count, then writes count + 1 as a second call. The
    /// two steps are not atomic: concurrent cheers on the same post can both
    /// read N and both write N + 1.
    async fn increment_cheer(&self, id: i64) -> Result<Post, GatewayError> {
        let current = self.get_by_id(id).await?;
        let next = current.cheer_count.saturating_add(1);
        self.update(id, UpdatePostInput::new().with_cheer_count(next))
            .await
    }
}

/// Comment collection contract
#[async_trait]
pub trait CommentGateway: Send + Sync {
    /// Comments of one post, newest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, GatewayError>;

    async fn get_by_id(&self, id: i64) -> Result<Comment, GatewayError>;

    async fn create(&self, input: CreateCommentInput) -> Result<Comment, GatewayError>;

    async fn update(&self, id: i64, input: UpdateCommentInput) -> Result<Comment, GatewayError>;

    async fn delete(&self, id: i64) -> Result<(), GatewayError>;
}

/// Everything a view model needs from the external store
#[derive(Clone)]
pub struct Backend {
    pub posts: Arc<dyn PostGateway>,
    pub comments: Arc<dyn CommentGateway>,
    pub changes: Arc<dyn ChangeSource>,
}

impl Backend {
    pub fn new(
        posts: Arc<dyn PostGateway>,
        comments: Arc<dyn CommentGateway>,
        changes: Arc<dyn ChangeSource>,
    ) -> Self {
        Self {
            posts,
            comments,
            changes,
        }
    }

    /// Build a backend from one store implementing all three contracts
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PostGateway + CommentGateway + ChangeSource + 'static,
    {
        Self {
            posts: store.clone(),
            comments: store.clone(),
            changes: store,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}
