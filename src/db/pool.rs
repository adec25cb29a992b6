//! SQLite connection pool
//!
//! Wraps an `sqlx` SQLite pool for the local development backend. File
//! databases get their parent directory created; `:memory:` databases are
//! pinned to a single long-lived connection so the schema survives.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

/// SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

fn is_in_memory(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

/// Build the sqlx connection URL, creating file databases on first use
fn connection_url(url: &str) -> String {
    if url.starts_with("sqlite:") {
        if url.contains('?') || is_in_memory(url) {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else if url == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite:{}?mode=rwc", url)
    }
}

impl SqliteDatabase {
    /// Connect to a SQLite database.
    ///
    /// Accepts a plain file path, a `sqlite:` URL or `:memory:`.
    pub async fn new(url: &str) -> Result<Self> {
        let in_memory = is_in_memory(url);

        if !in_memory {
            let path = url.trim_start_matches("sqlite:");
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let options = if in_memory {
            // Every connection to :memory: is a separate database
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        // Set per connection so every pooled connection enforces cascades
        let connect_options = SqliteConnectOptions::from_str(&connection_url(url))
            .with_context(|| format!("Invalid SQLite database URL: {}", url))?
            .foreign_keys(true);

        let pool = options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Create a SQLite in-memory database for testing
pub async fn create_test_pool() -> Result<SqliteDatabase> {
    SqliteDatabase::new(":memory:").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("data/stride.db"), "sqlite:data/stride.db?mode=rwc");
        assert_eq!(connection_url("sqlite:x.db"), "sqlite:x.db?mode=rwc");
        assert_eq!(connection_url("sqlite:x.db?mode=ro"), "sqlite:x.db?mode=ro");
    }

    #[tokio::test]
    async fn test_memory_pool_ping() {
        let db = create_test_pool().await.expect("Failed to create test pool");
        db.ping().await.expect("ping");
        db.close().await;
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("stride.db");

        let db = SqliteDatabase::new(path.to_str().unwrap())
            .await
            .expect("Failed to open file database");
        db.ping().await.expect("ping");

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_every_connection_enforces_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stride.db");
        let db = SqliteDatabase::new(path.to_str().unwrap())
            .await
            .expect("Failed to open file database");

        // Hold several at once so the pool has to open distinct connections
        let mut held = Vec::new();
        for _ in 0..3 {
            held.push(db.pool().acquire().await.expect("acquire"));
        }
        for conn in held.iter_mut() {
            let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
                .fetch_one(&mut **conn)
                .await
                .expect("pragma");
            assert_eq!(enabled, 1);
        }
    }
}
