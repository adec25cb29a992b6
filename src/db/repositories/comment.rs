//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::SqlxStore;
use crate::gateway::{CommentGateway, GatewayError};
use crate::models::{Comment, CreateCommentInput, UpdateCommentInput};
use crate::realtime::ChangeEvent;

#[async_trait]
impl CommentGateway for SqlxStore {
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, GatewayError> {
        Ok(list_comments_by_post_sqlite(self.db.pool(), post_id).await?)
    }

    async fn get_by_id(&self, id: i64) -> Result<Comment, GatewayError> {
        get_comment_by_id_sqlite(self.db.pool(), id)
            .await?
            .ok_or_else(|| GatewayError::comment_not_found(id))
    }

    async fn create(&self, input: CreateCommentInput) -> Result<Comment, GatewayError> {
        let _commit = self.commit.lock().await;
        if !post_exists_sqlite(self.db.pool(), input.post_id).await? {
            return Err(GatewayError::post_not_found(input.post_id));
        }

        let comment = create_comment_sqlite(self.db.pool(), input).await?;
        self.comment_changes
            .publish(ChangeEvent::Inserted(comment.clone()));
        Ok(comment)
    }

    async fn update(&self, id: i64, input: UpdateCommentInput) -> Result<Comment, GatewayError> {
        let _commit = self.commit.lock().await;
        let mut comment = get_comment_by_id_sqlite(self.db.pool(), id)
            .await?
            .ok_or_else(|| GatewayError::comment_not_found(id))?;

        input.apply_to(&mut comment);
        update_comment_sqlite(self.db.pool(), &comment).await?;

        self.comment_changes
            .publish(ChangeEvent::Updated(comment.clone()));
        Ok(comment)
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        let _commit = self.commit.lock().await;
        if !delete_comment_sqlite(self.db.pool(), id).await? {
            return Err(GatewayError::comment_not_found(id));
        }

        self.comment_changes.publish(ChangeEvent::Deleted { id });
        Ok(())
    }
}

// SQLite implementations

async fn list_comments_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<Comment>> {
    let rows = sqlx::query(
        r#"
        SELECT id, post_id, author, content, created_at
        FROM comments
        WHERE post_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await
    .context("Failed to list comments")?;

    rows.iter().map(row_to_comment_sqlite).collect()
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query("SELECT id, post_id, author, content, created_at FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get comment by ID")?;

    row.as_ref().map(row_to_comment_sqlite).transpose()
}

async fn post_exists_sqlite(pool: &SqlitePool, post_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
        .context("Failed to check post")?;
    let count: i64 = row.try_get("count")?;
    Ok(count > 0)
}

async fn create_comment_sqlite(pool: &SqlitePool, input: CreateCommentInput) -> Result<Comment> {
    let created_at = input.created_at.unwrap_or_else(Utc::now);

    let result = sqlx::query(
        "INSERT INTO comments (post_id, author, content, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(input.post_id)
    .bind(&input.author)
    .bind(&input.content)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        post_id: input.post_id,
        author: input.author,
        content: input.content,
        created_at,
    })
}

async fn update_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<()> {
    sqlx::query("UPDATE comments SET author = ?, content = ? WHERE id = ?")
        .bind(&comment.author)
        .bind(&comment.content)
        .bind(comment.id)
        .execute(pool)
        .await
        .context("Failed to update comment")?;
    Ok(())
}

async fn delete_comment_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete comment")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        post_id: row.try_get("post_id")?,
        author: row.try_get("author")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::super::setup_test_store;
    use crate::gateway::{CommentGateway, GatewayError, PostGateway};
    use crate::models::{CreateCommentInput, CreatePostInput, UpdateCommentInput};
    use crate::realtime::{ChangeEvent, ChangeSource};

    #[tokio::test]
    async fn test_create_comment_publishes_insert() {
        let store = setup_test_store().await;
        let post = PostGateway::create(&store, CreatePostInput::new("Title", ""))
            .await
            .unwrap();
        let mut events = store.subscribe_comments().await.unwrap();

        let comment = CommentGateway::create(&store, CreateCommentInput::new(post.id, "You", "Great pace"))
            .await
            .expect("Failed to create comment");

        assert_eq!(comment.post_id, post.id);
        assert_eq!(comment.author, "You");
        assert_eq!(events.try_recv(), Some(ChangeEvent::Inserted(comment)));
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let store = setup_test_store().await;
        let result = CommentGateway::create(&store, CreateCommentInput::new(77, "You", "hi")).await;
        assert!(matches!(result, Err(GatewayError::NotFound { kind: "Post", id: 77 })));
    }

    #[tokio::test]
    async fn test_list_by_post_only_returns_that_post() {
        let store = setup_test_store().await;
        let a = PostGateway::create(&store, CreatePostInput::new("A", "")).await.unwrap();
        let b = PostGateway::create(&store, CreatePostInput::new("B", "")).await.unwrap();
        CommentGateway::create(&store, CreateCommentInput::new(a.id, "You", "on a"))
            .await
            .unwrap();
        CommentGateway::create(&store, CreateCommentInput::new(b.id, "You", "on b"))
            .await
            .unwrap();

        let comments = store.list_by_post(a.id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "on a");
    }

    #[tokio::test]
    async fn test_update_and_delete_comment() {
        let store = setup_test_store().await;
        let post = PostGateway::create(&store, CreatePostInput::new("A", "")).await.unwrap();
        let comment = CommentGateway::create(&store, CreateCommentInput::new(post.id, "You", "hi"))
            .await
            .unwrap();

        let updated = CommentGateway::update(
            &store,
            comment.id,
            UpdateCommentInput {
                author: Some("Coach".to_string()),
                content: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.author, "Coach");
        assert_eq!(updated.content, "hi");

        CommentGateway::delete(&store, comment.id).await.unwrap();
        let again = CommentGateway::delete(&store, comment.id).await;
        assert!(matches!(again, Err(GatewayError::NotFound { kind: "Comment", .. })));
    }
}
