//! Storage backends
//!
//! Two implementations of the gateway contracts:
//! - [`MemoryStore`]: in-process collection with optional simulated latency
//! - [`SqlxStore`]: SQLite through `sqlx`, for local development
//!
//! The driver is selected from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use stride::config::BackendConfig;
//! use stride::db::create_backend;
//!
//! let backend = create_backend(&BackendConfig::default()).await?;
//! let posts = backend.posts.list_all().await?;
//! ```

mod memory;
pub mod migrations;
pub mod pool;
pub mod repositories;

pub use memory::MemoryStore;
pub use pool::{create_test_pool, SqliteDatabase};
pub use repositories::SqlxStore;

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendConfig, BackendDriver};
use crate::gateway::{Backend, PostGateway};
use crate::models::UpdatePostInput;
use crate::views::fallback::demo_posts;

/// Create the backend selected by configuration.
///
/// The sqlite driver runs pending migrations first. With `seed_demo` set,
/// an empty store receives the demonstration posts.
pub async fn create_backend(config: &BackendConfig) -> Result<Backend> {
    let backend = match config.driver {
        BackendDriver::Memory => {
            let store = MemoryStore::with_latency(Duration::from_millis(config.latency_ms));
            Backend::from_store(Arc::new(store))
        }
        BackendDriver::Sqlite => {
            let db = SqliteDatabase::new(&config.url).await?;
            migrations::run_migrations(db.pool()).await?;
            Backend::from_store(Arc::new(SqlxStore::new(db)))
        }
    };
    tracing::info!("Backend ready: {}", config.driver.as_str());

    if config.seed_demo {
        let seeded = seed_demo_posts(backend.posts.as_ref()).await?;
        if seeded > 0 {
            tracing::info!("Seeded {} demo post(s)", seeded);
        }
    }

    Ok(backend)
}

/// Insert the demonstration posts if the store has none.
///
/// Returns the number of posts created.
pub async fn seed_demo_posts(posts: &dyn PostGateway) -> Result<usize> {
    let existing = posts.list_all().await.context("Failed to read posts")?;
    if !existing.is_empty() {
        return Ok(0);
    }

    let demo = demo_posts(Utc::now());
    let count = demo.len();
    // Oldest first so the store assigns ids in chronological order
    for (input, cheers) in demo.into_iter().rev() {
        let post = posts.create(input).await.context("Failed to seed post")?;
        if cheers > 0 {
            posts
                .update(post.id, UpdatePostInput::new().with_cheer_count(cheers))
                .await
                .context("Failed to seed cheers")?;
        }
    }

    Ok(count)
}
