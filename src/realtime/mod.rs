//! Change notification channel
//!
//! One channel per table delivers row-level change events in commit order.
//! Channels are table-scoped: every insert, update and delete on the table
//! reaches every subscriber, and consumers filter on their side.
//!
//! Delivery is push-only. A [`Subscription`] is the single consumer's end of
//! the queue; it releases its registration when unsubscribed or dropped, so a
//! torn-down view model never receives further events.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut posts = backend.changes.subscribe_posts().await?;
//! while let Some(event) = posts.recv().await {
//!     feed.apply(event);
//! }
//! ```

mod hub;

pub use hub::ChangeHub;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::gateway::GatewayError;
use crate::models::{Comment, Post, Record};

/// A row-level change on one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "UPPERCASE")]
pub enum ChangeEvent<T> {
    /// New row, full state
    Inserted(T),
    /// Changed row, full new state
    Updated(T),
    /// Removed row, identity only
    Deleted { id: i64 },
}

impl<T: Record> ChangeEvent<T> {
    /// Identity of the affected row
    pub fn id(&self) -> i64 {
        match self {
            ChangeEvent::Inserted(record) | ChangeEvent::Updated(record) => record.id(),
            ChangeEvent::Deleted { id } => *id,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Inserted(_) => "inserted",
            ChangeEvent::Updated(_) => "updated",
            ChangeEvent::Deleted { .. } => "deleted",
        }
    }
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Consumer end of a change channel.
pub struct Subscription<T> {
    table: &'static str,
    rx: mpsc::UnboundedReceiver<ChangeEvent<T>>,
    release: Option<Release>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver. `release` runs exactly once, on unsubscribe or drop.
    pub fn new<F>(table: &'static str, rx: mpsc::UnboundedReceiver<ChangeEvent<T>>, release: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            table,
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the channel is closed. Cancel safe: dropping the
    /// future before it resolves loses no event.
    pub async fn recv(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<ChangeEvent<T>> {
        self.rx.try_recv().ok()
    }

    /// Whether this subscription has been released
    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Stop delivery and release the registration
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            self.rx.close();
            release();
            tracing::debug!("Released {} subscription", self.table);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl<T> Unpin for Subscription<T> {}

impl<T> Stream for Subscription<T> {
    type Item = ChangeEvent<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("table", &self.table)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Source of per-table change channels
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Open the posts channel
    async fn subscribe_posts(&self) -> Result<Subscription<Post>, GatewayError>;

    /// Open the comments channel
    async fn subscribe_comments(&self) -> Result<Subscription<Comment>, GatewayError>;
}
