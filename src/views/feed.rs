//! Feed screen state
//!
//! Mirrors the post collection in `all_posts` and derives `visible_posts`
//! from it. Two rules are easy to trip over:
//! - `set_criteria` filters `all_posts` and keeps their order; only
//!   `set_sort` reorders.
//! - Inserted posts are shown at the top no matter the active criteria. They
//!   drop out of view the next time criteria are applied if they don't match.

use chrono::{DateTime, Utc};

use crate::gateway::Backend;
use crate::models::{Category, FeedCriteria, Post, SortKey};
use crate::realtime::{ChangeEvent, Subscription};

use super::fallback::fallback_feed;
use super::projection::{filter_posts, remove_by_id, replace_by_id, sort_posts, upsert_front};
use super::{PostCard, SessionContext, ViewError};

pub struct FeedViewModel {
    backend: Backend,
    session: SessionContext,
    all_posts: Vec<Post>,
    visible_posts: Vec<Post>,
    criteria: FeedCriteria,
    sort: SortKey,
    subscription: Option<Subscription<Post>>,
    degraded: bool,
}

impl FeedViewModel {
    pub fn new(backend: Backend, session: SessionContext) -> Self {
        Self {
            backend,
            session,
            all_posts: Vec::new(),
            visible_posts: Vec::new(),
            criteria: FeedCriteria::default(),
            sort: SortKey::default(),
            subscription: None,
            degraded: false,
        }
    }

    /// Open the posts channel and load the snapshot.
    ///
    /// The channel is opened before the read, and events queued meanwhile are
    /// replayed onto the snapshot, so a commit landing mid-load is not lost.
    ///
    /// Criteria and sort reset to their defaults. A failed read never fails
    /// activation: the feed shows the demonstration posts (or nothing, if the
    /// session disables fallback) and `is_degraded` turns true. A failure to
    /// open the channel is returned; the snapshot stays loaded.
    pub async fn initialize(&mut self) -> Result<(), ViewError> {
        self.teardown();
        self.criteria = FeedCriteria::default();
        self.sort = SortKey::default();

        let subscription = self.backend.changes.subscribe_posts().await;

        match self.backend.posts.list_all().await {
            Ok(posts) => {
                tracing::info!("Feed loaded {} post(s)", posts.len());
                self.all_posts = posts;
                self.degraded = false;
            }
            Err(e) => {
                tracing::warn!("Failed to load feed, showing fallback content: {}", e);
                self.all_posts = if self.session.fallback_on_read_error() {
                    fallback_feed(Utc::now())
                } else {
                    Vec::new()
                };
                self.degraded = true;
            }
        }
        self.visible_posts = filter_posts(&self.all_posts, &self.criteria);

        self.subscription = Some(subscription?);
        let replayed = self.drain_pending();
        if replayed > 0 {
            tracing::debug!("Feed replayed {} event(s) queued during load", replayed);
        }
        Ok(())
    }

    /// Merge one posts-channel event into both lists
    pub fn apply(&mut self, event: ChangeEvent<Post>) {
        tracing::debug!("Feed applying {} for post #{}", event.kind(), event.id());
        match event {
            ChangeEvent::Inserted(post) => {
                upsert_front(&mut self.all_posts, post.clone());
                upsert_front(&mut self.visible_posts, post);
            }
            ChangeEvent::Updated(mut post) => {
                // Events carry no comment count; keep the one from the last fetch
                if let Some(existing) = self.all_posts.iter().find(|p| p.id == post.id) {
                    post.comment_count = existing.comment_count;
                }
                replace_by_id(&mut self.all_posts, &post);
                replace_by_id(&mut self.visible_posts, &post);
            }
            ChangeEvent::Deleted { id } => {
                remove_by_id(&mut self.all_posts, id);
                remove_by_id(&mut self.visible_posts, id);
            }
        }
    }

    /// Wait for the next posts-channel event.
    ///
    /// Returns `None` when there is no open channel or it has closed.
    pub async fn next_change(&mut self) -> Option<ChangeEvent<Post>> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => None,
        }
    }

    /// Wait for one event and apply it. Returns false once the channel is gone.
    pub async fn process_next(&mut self) -> bool {
        match self.next_change().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued; returns how many were applied
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_recv()) {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Replace the filter and recompute the visible posts from `all_posts`
    pub fn set_criteria(&mut self, criteria: FeedCriteria) {
        self.visible_posts = filter_posts(&self.all_posts, &criteria);
        self.criteria = criteria;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        let criteria = self.criteria.clone().with_search(search);
        self.set_criteria(criteria);
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        let criteria = self.criteria.clone().with_category(category);
        self.set_criteria(criteria);
    }

    /// Stable re-sort of the visible posts
    pub fn set_sort(&mut self, key: SortKey) {
        sort_posts(&mut self.visible_posts, key);
        self.sort = key;
    }

    /// Release the posts channel. Safe to call more than once.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("Feed released its subscription");
        }
    }

    pub fn all_posts(&self) -> &[Post] {
        &self.all_posts
    }

    pub fn visible_posts(&self) -> &[Post] {
        &self.visible_posts
    }

    pub fn criteria(&self) -> &FeedCriteria {
        &self.criteria
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    /// Showing fallback content after a failed read
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether the posts channel is open
    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Visible posts as render-ready cards
    pub fn cards(&self, now: DateTime<Utc>) -> Vec<PostCard> {
        self.visible_posts
            .iter()
            .map(|post| PostCard::from_post(post, now))
            .collect()
    }
}

impl std::fmt::Debug for FeedViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedViewModel")
            .field("all_posts", &self.all_posts.len())
            .field("visible_posts", &self.visible_posts.len())
            .field("criteria", &self.criteria)
            .field("sort", &self.sort)
            .field("live", &self.is_live())
            .field("degraded", &self.degraded)
            .finish()
    }
}
