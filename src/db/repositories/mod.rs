//! SQLite-backed store
//!
//! Repository implementations of the gateway contracts over `sqlx`. Each
//! table lives in its own file; both share [`SqlxStore`], which owns the
//! pool and the change hubs.
//!
//! Writes are serialized by a commit guard held from the first statement
//! until the change event is published, so subscribers observe events in
//! commit order.

mod comment;
mod post;

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::SqliteDatabase;
use crate::gateway::GatewayError;
use crate::models::{Comment, Post};
use crate::realtime::{ChangeHub, ChangeSource, Subscription};

/// SQL store with change fan-out
#[derive(Debug)]
pub struct SqlxStore {
    db: SqliteDatabase,
    commit: Mutex<()>,
    post_changes: ChangeHub<Post>,
    comment_changes: ChangeHub<Comment>,
}

impl SqlxStore {
    /// Wrap a migrated database
    pub fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
            commit: Mutex::new(()),
            post_changes: ChangeHub::new(),
            comment_changes: ChangeHub::new(),
        }
    }

    pub fn database(&self) -> &SqliteDatabase {
        &self.db
    }
}

#[async_trait]
impl ChangeSource for SqlxStore {
    async fn subscribe_posts(&self) -> Result<Subscription<Post>, GatewayError> {
        self.db.ping().await.context("Posts channel unavailable")?;
        Ok(self.post_changes.subscribe())
    }

    async fn subscribe_comments(&self) -> Result<Subscription<Comment>, GatewayError> {
        self.db.ping().await.context("Comments channel unavailable")?;
        Ok(self.comment_changes.subscribe())
    }
}

#[cfg(test)]
pub(crate) async fn setup_test_store() -> SqlxStore {
    let db = crate::db::create_test_pool()
        .await
        .expect("Failed to create test pool");
    crate::db::migrations::run_migrations(db.pool())
        .await
        .expect("Failed to run migrations");
    SqlxStore::new(db)
}
