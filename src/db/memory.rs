//! In-process store
//!
//! Implements the gateway and change channel contracts over two ordered maps.
//! Used by tests and by the demo binary when no database is configured.
//!
//! Two knobs make it behave like a remote service:
//! - `latency`: every call sleeps for one simulated round trip before it
//!   touches state, so interleavings seen against a real backend (such as
//!   two cheers reading the same count) are reproducible in-process.
//! - `set_online(false)`: every call fails with `BackendUnavailable`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::gateway::{CommentGateway, GatewayError, PostGateway};
use crate::models::{
    Comment, CreateCommentInput, CreatePostInput, Post, UpdateCommentInput, UpdatePostInput,
};
use crate::realtime::{ChangeEvent, ChangeHub, ChangeSource, Subscription};

#[derive(Debug, Default)]
struct StoreState {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_post_id: i64,
    last_comment_id: i64,
}

/// In-memory backend with change fan-out
#[derive(Debug)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    post_changes: ChangeHub<Post>,
    comment_changes: ChangeHub<Comment>,
    latency: Duration,
    online: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Create a store that waits `latency` on every call
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            post_changes: ChangeHub::new(),
            comment_changes: ChangeHub::new(),
            latency,
            online: AtomicBool::new(true),
        }
    }

    /// Simulate losing or regaining the connection
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        tracing::debug!("Memory store is now {}", if online { "online" } else { "offline" });
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Live subscriptions on the posts channel
    pub fn post_subscriber_count(&self) -> usize {
        self.post_changes.subscriber_count()
    }

    /// Live subscriptions on the comments channel
    pub fn comment_subscriber_count(&self) -> usize {
        self.comment_changes.subscriber_count()
    }

    async fn round_trip(&self) -> Result<(), GatewayError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.is_online() {
            Ok(())
        } else {
            Err(GatewayError::BackendUnavailable(anyhow!(
                "memory store is offline"
            )))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Newest first, ties broken by the later id
fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl PostGateway for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Post>, GatewayError> {
        self.round_trip().await?;
        let state = self.state.read().await;

        let mut counts: HashMap<i64, u32> = HashMap::new();
        for comment in state.comments.values() {
            *counts.entry(comment.post_id).or_default() += 1;
        }

        let mut posts: Vec<Post> = state
            .posts
            .values()
            .map(|post| Post {
                comment_count: counts.get(&post.id).copied().unwrap_or(0),
                ..post.clone()
            })
            .collect();
        newest_first(&mut posts, |p| (p.created_at, p.id));
        Ok(posts)
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, GatewayError> {
        self.round_trip().await?;
        self.state
            .read()
            .await
            .posts
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::post_not_found(id))
    }

    async fn create(&self, input: CreatePostInput) -> Result<Post, GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        state.last_post_id += 1;
        let post = Post {
            id: state.last_post_id,
            title: input.title,
            content: input.content,
            image_url: input.image_url,
            tags: input.tags,
            cheer_count: 0,
            comment_count: 0,
            created_at: input.created_at.unwrap_or_else(Utc::now),
        };
        state.posts.insert(post.id, post.clone());
        self.post_changes.publish(ChangeEvent::Inserted(post.clone()));

        Ok(post)
    }

    async fn update(&self, id: i64, input: UpdatePostInput) -> Result<Post, GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        let post = state
            .posts
            .get_mut(&id)
            .ok_or_else(|| GatewayError::post_not_found(id))?;
        input.apply_to(post);
        let post = post.clone();
        self.post_changes.publish(ChangeEvent::Updated(post.clone()));

        Ok(post)
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        if state.posts.remove(&id).is_none() {
            return Err(GatewayError::post_not_found(id));
        }

        // Cascade
        let orphaned: Vec<i64> = state
            .comments
            .values()
            .filter(|c| c.post_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in orphaned {
            state.comments.remove(&comment_id);
            self.comment_changes
                .publish(ChangeEvent::Deleted { id: comment_id });
        }
        self.post_changes.publish(ChangeEvent::Deleted { id });

        Ok(())
    }
}

#[async_trait]
impl CommentGateway for MemoryStore {
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, GatewayError> {
        self.round_trip().await?;
        let state = self.state.read().await;

        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }

    async fn get_by_id(&self, id: i64) -> Result<Comment, GatewayError> {
        self.round_trip().await?;
        self.state
            .read()
            .await
            .comments
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::comment_not_found(id))
    }

    async fn create(&self, input: CreateCommentInput) -> Result<Comment, GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        if !state.posts.contains_key(&input.post_id) {
            return Err(GatewayError::post_not_found(input.post_id));
        }

        state.last_comment_id += 1;
        let comment = Comment {
            id: state.last_comment_id,
            post_id: input.post_id,
            author: input.author,
            content: input.content,
            created_at: input.created_at.unwrap_or_else(Utc::now),
        };
        state.comments.insert(comment.id, comment.clone());
        self.comment_changes
            .publish(ChangeEvent::Inserted(comment.clone()));

        Ok(comment)
    }

    async fn update(&self, id: i64, input: UpdateCommentInput) -> Result<Comment, GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        let comment = state
            .comments
            .get_mut(&id)
            .ok_or_else(|| GatewayError::comment_not_found(id))?;
        input.apply_to(comment);
        let comment = comment.clone();
        self.comment_changes
            .publish(ChangeEvent::Updated(comment.clone()));

        Ok(comment)
    }

    async fn delete(&self, id: i64) -> Result<(), GatewayError> {
        self.round_trip().await?;
        let mut state = self.state.write().await;

        if state.comments.remove(&id).is_none() {
            return Err(GatewayError::comment_not_found(id));
        }
        self.comment_changes.publish(ChangeEvent::Deleted { id });

        Ok(())
    }
}

#[async_trait]
impl ChangeSource for MemoryStore {
    async fn subscribe_posts(&self) -> Result<Subscription<Post>, GatewayError> {
        self.round_trip().await?;
        Ok(self.post_changes.subscribe())
    }

    async fn subscribe_comments(&self) -> Result<Subscription<Comment>, GatewayError> {
        self.round_trip().await?;
        Ok(self.comment_changes.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Backend;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, Backend) {
        let store = Arc::new(MemoryStore::new());
        let backend = Backend::from_store(store.clone());
        (store, backend)
    }

    // ========================================================================
    // Posts
    // ========================================================================

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let (_store, backend) = setup();

        let a = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        let b = backend.posts.create(CreatePostInput::new("B", "")).await.unwrap();

        assert!(b.id > a.id);
        assert_eq!(a.cheer_count, 0);
        assert_eq!(a.comment_count, 0);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let (_store, backend) = setup();

        let a = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        backend.posts.delete(a.id).await.unwrap();
        let b = backend.posts.create(CreatePostInput::new("B", "")).await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_list_all_newest_first_with_comment_counts() {
        let (_store, backend) = setup();
        let now = Utc::now();

        let old = backend
            .posts
            .create(CreatePostInput::new("Old", "").with_created_at(now - ChronoDuration::hours(3)))
            .await
            .unwrap();
        let new = backend
            .posts
            .create(CreatePostInput::new("New", "").with_created_at(now))
            .await
            .unwrap();
        for text in ["one", "two"] {
            backend
                .comments
                .create(CreateCommentInput::new(old.id, "You", text))
                .await
                .unwrap();
        }

        let posts = backend.posts.list_all().await.unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
        assert_eq!(posts[0].comment_count, 0);
        assert_eq!(posts[1].comment_count, 2);
    }

    #[tokio::test]
    async fn test_get_missing_post_is_not_found() {
        let (_store, backend) = setup();
        let result = backend.posts.get_by_id(42).await;
        assert!(matches!(result, Err(GatewayError::NotFound { id: 42, .. })));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (_store, backend) = setup();
        let post = backend
            .posts
            .create(CreatePostInput::new("Title", "Body").with_tags(["10K"]))
            .await
            .unwrap();

        let updated = backend
            .posts
            .update(post.id, UpdatePostInput::new().with_content("New body"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Title");
        assert_eq!(updated.content, "New body");
        assert!(updated.tags.contains("10K"));
        assert_eq!(updated.created_at, post.created_at);
    }

    #[tokio::test]
    async fn test_repeated_delete_reports_not_found() {
        let (_store, backend) = setup();
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();

        backend.posts.delete(post.id).await.unwrap();
        let again = backend.posts.delete(post.id).await;

        assert!(matches!(again, Err(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let (store, backend) = setup();
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        let comment = backend
            .comments
            .create(CreateCommentInput::new(post.id, "You", "hi"))
            .await
            .unwrap();
        let mut comment_events = backend.changes.subscribe_comments().await.unwrap();

        backend.posts.delete(post.id).await.unwrap();

        assert!(backend.comments.get_by_id(comment.id).await.is_err());
        assert_eq!(
            comment_events.try_recv(),
            Some(ChangeEvent::Deleted { id: comment.id })
        );
        assert_eq!(store.comment_subscriber_count(), 1);
    }

    // ========================================================================
    // Cheers
    // ========================================================================

    #[tokio::test]
    async fn test_sequential_cheers_both_count() {
        let (_store, backend) = setup();
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        backend
            .posts
            .update(post.id, UpdatePostInput::new().with_cheer_count(24))
            .await
            .unwrap();

        backend.posts.increment_cheer(post.id).await.unwrap();
        let after = backend.posts.increment_cheer(post.id).await.unwrap();

        assert_eq!(after.cheer_count, 26);
    }

    #[tokio::test]
    async fn test_concurrent_cheers_may_lose_an_increment() {
        let store = Arc::new(MemoryStore::with_latency(Duration::from_millis(5)));
        let backend = Backend::from_store(store);
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        backend
            .posts
            .update(post.id, UpdatePostInput::new().with_cheer_count(24))
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            backend.posts.increment_cheer(post.id),
            backend.posts.increment_cheer(post.id)
        );
        a.unwrap();
        b.unwrap();

        // Read-then-write is not atomic: 25 is a known outcome
        let count = backend.posts.get_by_id(post.id).await.unwrap().cheer_count;
        assert!(count == 25 || count == 26, "unexpected count {}", count);
    }

    // ========================================================================
    // Comments
    // ========================================================================

    #[tokio::test]
    async fn test_comments_for_missing_post_rejected() {
        let (_store, backend) = setup();
        let result = backend
            .comments
            .create(CreateCommentInput::new(99, "You", "hi"))
            .await;
        assert!(matches!(result, Err(GatewayError::NotFound { kind: "Post", id: 99 })));
    }

    #[tokio::test]
    async fn test_list_by_post_newest_first() {
        let (_store, backend) = setup();
        let now = Utc::now();
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        let other = backend.posts.create(CreatePostInput::new("B", "")).await.unwrap();

        let first = backend
            .comments
            .create(
                CreateCommentInput::new(post.id, "You", "first")
                    .with_created_at(now - ChronoDuration::minutes(5)),
            )
            .await
            .unwrap();
        let second = backend
            .comments
            .create(CreateCommentInput::new(post.id, "You", "second").with_created_at(now))
            .await
            .unwrap();
        backend
            .comments
            .create(CreateCommentInput::new(other.id, "You", "elsewhere"))
            .await
            .unwrap();

        let ids: Vec<i64> = backend
            .comments
            .list_by_post(post.id)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_comment_update_and_delete() {
        let (_store, backend) = setup();
        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        let comment = backend
            .comments
            .create(CreateCommentInput::new(post.id, "You", "hi"))
            .await
            .unwrap();

        let updated = backend
            .comments
            .update(
                comment.id,
                UpdateCommentInput {
                    content: Some("edited".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.author, "You");

        backend.comments.delete(comment.id).await.unwrap();
        assert!(backend.comments.delete(comment.id).await.is_err());
    }

    // ========================================================================
    // Availability and change channel
    // ========================================================================

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let (store, backend) = setup();
        store.set_online(false);

        assert!(matches!(
            backend.posts.list_all().await,
            Err(GatewayError::BackendUnavailable(_))
        ));
        assert!(matches!(
            backend.posts.create(CreatePostInput::new("A", "")).await,
            Err(GatewayError::BackendUnavailable(_))
        ));
        assert!(backend.changes.subscribe_posts().await.is_err());

        store.set_online(true);
        assert!(backend.posts.list_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_events_follow_commit_order() {
        let (_store, backend) = setup();
        let mut events = backend.changes.subscribe_posts().await.unwrap();

        let post = backend.posts.create(CreatePostInput::new("A", "")).await.unwrap();
        backend
            .posts
            .update(post.id, UpdatePostInput::new().with_title("B"))
            .await
            .unwrap();
        backend.posts.delete(post.id).await.unwrap();

        let kinds: Vec<&str> = std::iter::from_fn(|| events.try_recv())
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec!["inserted", "updated", "deleted"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_releases_registration() {
        let (store, backend) = setup();
        let events = backend.changes.subscribe_posts().await.unwrap();
        assert_eq!(store.post_subscriber_count(), 1);

        events.unsubscribe();
        assert_eq!(store.post_subscriber_count(), 0);
    }
}
