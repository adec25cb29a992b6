//! Post repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::SqlxStore;
use crate::gateway::{GatewayError, PostGateway};
use crate::models::{CreatePostInput, Post, TagSet, UpdatePostInput};
use crate::realtime::ChangeEvent;

#[async_trait]
impl PostGateway for SqlxStore {
    async fn list_all(&self) -> Result<Vec<Post>, GatewayError> {
        Ok(list_posts_sqlite(self.db.pool()).await?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, GatewayError> {
        get_post_by_id_sqlite(self.db.pool(), id)
            .await?
            .ok_or_else(|| GatewayError::post_not_found(id))
    }

    async fn create(&self, input: CreatePostInput) -> Result<Post, GatewayError> {
        let _commit = self.commit.lock().await;
        let post = create_post_sqlite(self.db.pool(), input).await?;
        self.post_changes.publish(ChangeEvent::Inserted(post.clone()));
        Ok(post)
    }

    async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, GatewayError> {
        let _commit = self.commit.lock().await;
        let mut post = get_post_by_id_sqlite(self.db.pool(), id)
            .await?
            .ok_or_else(|| GatewayError::post_not_found(id))?;

        input.apply_to(&mut post);
        update_post_sqlite(self.db.pool(), &post).await?;

        self.post_changes.publish(ChangeEvent::Updated(post.clone()));
        Ok(post)
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        let _commit = self.commit.lock().await;
        let removed_comments = match delete_post_sqlite(self.db.pool(), id).await? {
            Some(ids) => ids,
            None => return Err(GatewayError::post_not_found(id)),
        };

        for comment_id in removed_comments {
            self.comment_changes
                .publish(ChangeEvent::Deleted { id: comment_id });
        }
        self.post_changes.publish(ChangeEvent::Deleted { id });
        Ok(())
    }
}

// SQLite implementations

async fn list_posts_sqlite(pool: &SqlitePool) -> Result<Vec<Post>> {
    let rows = sqlx::query(
        r#"
        SELECT p.id, p.title, p.content, p.image_url, p.tags, p.cheer_count, p.created_at,
               (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
        FROM posts p
        ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list posts")?;

    let mut posts = Vec::with_capacity(rows.len());
    for row in rows {
        let mut post = row_to_post_sqlite(&row)?;
        let comment_count: i64 = row.try_get("comment_count")?;
        post.comment_count = u32::try_from(comment_count).unwrap_or(u32::MAX);
        posts.push(post);
    }

    Ok(posts)
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(
        r#"
        SELECT id, title, content, image_url, tags, cheer_count, created_at
        FROM posts
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get post by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_post_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn create_post_sqlite(pool: &SqlitePool, input: CreatePostInput) -> Result<Post> {
    let created_at = input.created_at.unwrap_or_else(Utc::now);
    let tags = serde_json::to_string(&input.tags).context("Failed to encode tags")?;

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, content, image_url, tags, cheer_count, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(&input.image_url)
    .bind(&tags)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        title: input.title,
        content: input.content,
        image_url: input.image_url,
        tags: input.tags,
        cheer_count: 0,
        comment_count: 0,
        created_at,
    })
}

async fn update_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<()> {
    let tags = serde_json::to_string(&post.tags).context("Failed to encode tags")?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, content = ?, image_url = ?, tags = ?, cheer_count = ?
        WHERE id = ?
        "#,
    )
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.image_url)
    .bind(&tags)
    .bind(i64::from(post.cheer_count))
    .bind(post.id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

/// Delete a post and its comments.
///
/// Returns the ids of the removed comments, or `None` if the post did not exist.
async fn delete_post_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Vec<i64>>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let comment_ids: Vec<i64> = sqlx::query("SELECT id FROM comments WHERE post_id = ? ORDER BY id")
        .bind(id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list comments of post")?
        .iter()
        .map(|row| row.try_get::<i64, _>("id"))
        .collect::<Result<_, sqlx::Error>>()?;

    sqlx::query("DELETE FROM comments WHERE post_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete comments of post")?;

    let result = sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete post")?;

    if result.rows_affected() == 0 {
        tx.rollback().await.context("Failed to roll back")?;
        return Ok(None);
    }

    tx.commit().await.context("Failed to commit post deletion")?;
    Ok(Some(comment_ids))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    let tags_json: String = row.try_get("tags")?;
    let tags: TagSet = serde_json::from_str(&tags_json)
        .with_context(|| format!("Invalid tags column: {}", tags_json))?;
    let cheer_count: i64 = row.try_get("cheer_count")?;

    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        image_url: row.try_get("image_url")?,
        tags,
        cheer_count: u32::try_from(cheer_count)
            .with_context(|| format!("Invalid cheer count: {}", cheer_count))?,
        comment_count: 0,
        created_at: row.try_get("created_at")?,
    })
}
