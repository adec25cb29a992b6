//! Post detail screen state
//!
//! Holds one post and its comments (newest first) and follows both change
//! channels, keeping only events about the active post. Cheers overwrite the
//! local post with what the store returns. New comments are not appended
//! locally; they show up when the comments channel delivers the insert.

use chrono::Utc;

use crate::gateway::{Backend, GatewayError};
use crate::models::{Comment, CreateCommentInput, Post};
use crate::realtime::{ChangeEvent, Subscription};

use super::compose::PostDraft;
use super::fallback::fallback_post;
use super::projection::{remove_by_id, replace_by_id, upsert_front};
use super::{Navigation, SessionContext, ViewError};

/// An event from either channel
#[derive(Debug, Clone, PartialEq)]
pub enum DetailChange {
    Post(ChangeEvent<Post>),
    Comment(ChangeEvent<Comment>),
}

pub struct DetailViewModel {
    backend: Backend,
    session: SessionContext,
    post_id: Option<i64>,
    post: Option<Post>,
    comments: Vec<Comment>,
    post_events: Option<Subscription<Post>>,
    comment_events: Option<Subscription<Comment>>,
    draft: Option<PostDraft>,
    removed: bool,
    degraded: bool,
}

async fn recv_or_pending<T>(subscription: &mut Option<Subscription<T>>) -> Option<ChangeEvent<T>> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

impl DetailViewModel {
    pub fn new(backend: Backend, session: SessionContext) -> Self {
        Self {
            backend,
            session,
            post_id: None,
            post: None,
            comments: Vec::new(),
            post_events: None,
            comment_events: None,
            draft: None,
            removed: false,
            degraded: false,
        }
    }

    /// Open both channels, then load `post_id` and its comments.
    ///
    /// Events queued while the reads are in flight are replayed onto the
    /// loaded state. A post that does not exist leaves `post` empty; the
    /// screen keeps showing its loading state. Other read failures show a
    /// demonstration post under the requested id (when the session allows
    /// fallback) and an empty comment list. If a channel cannot be opened,
    /// whatever was acquired is released and the error is returned.
    pub async fn initialize(&mut self, post_id: i64) -> Result<(), ViewError> {
        self.teardown();
        self.post_id = Some(post_id);
        self.draft = None;
        self.removed = false;
        self.degraded = false;

        let subscriptions = self.subscribe_both().await;

        let (post, comments) = tokio::join!(
            self.backend.posts.get_by_id(post_id),
            self.backend.comments.list_by_post(post_id)
        );

        self.post = match post {
            Ok(post) => Some(post),
            Err(GatewayError::NotFound { .. }) => {
                tracing::debug!("Post #{} not found", post_id);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to load post #{}, showing fallback content: {}", post_id, e);
                self.degraded = true;
                self.session
                    .fallback_on_read_error()
                    .then(|| fallback_post(post_id, Utc::now()))
            }
        };

        self.comments = comments.unwrap_or_else(|e| {
            tracing::warn!("Failed to load comments of post #{}: {}", post_id, e);
            Vec::new()
        });

        let (post_events, comment_events) = subscriptions?;
        self.post_events = Some(post_events);
        self.comment_events = Some(comment_events);

        let replayed = self.drain_pending();
        if replayed > 0 {
            tracing::debug!("Detail replayed {} event(s) queued during load", replayed);
        }
        Ok(())
    }

    async fn subscribe_both(
        &self,
    ) -> Result<(Subscription<Post>, Subscription<Comment>), GatewayError> {
        let post_events = self.backend.changes.subscribe_posts().await?;
        // post_events is dropped, and so released, if this fails
        let comment_events = self.backend.changes.subscribe_comments().await?;
        Ok((post_events, comment_events))
    }

    /// Whether an event concerns the active post
    pub fn is_relevant(&self, change: &DetailChange) -> bool {
        let Some(post_id) = self.post_id else {
            return false;
        };
        match change {
            DetailChange::Post(event) => event.id() == post_id,
            DetailChange::Comment(ChangeEvent::Inserted(comment))
            | DetailChange::Comment(ChangeEvent::Updated(comment)) => comment.post_id == post_id,
            DetailChange::Comment(ChangeEvent::Deleted { id }) => {
                self.comments.iter().any(|c| c.id == *id)
            }
        }
    }

    /// Merge one event. Events about other posts are ignored.
    pub fn apply(&mut self, change: DetailChange) {
        if !self.is_relevant(&change) {
            return;
        }

        match change {
            DetailChange::Post(ChangeEvent::Inserted(post))
            | DetailChange::Post(ChangeEvent::Updated(post)) => {
                tracing::debug!("Detail refreshed post #{}", post.id);
                self.post = Some(post);
            }
            DetailChange::Post(ChangeEvent::Deleted { id }) => {
                tracing::debug!("Post #{} was deleted", id);
                self.post = None;
                self.comments.clear();
                self.draft = None;
                self.removed = true;
            }
            DetailChange::Comment(ChangeEvent::Inserted(comment)) => {
                upsert_front(&mut self.comments, comment);
            }
            DetailChange::Comment(ChangeEvent::Updated(comment)) => {
                replace_by_id(&mut self.comments, &comment);
            }
            DetailChange::Comment(ChangeEvent::Deleted { id }) => {
                remove_by_id(&mut self.comments, id);
            }
        }
    }

    /// Wait for the next event about the active post.
    ///
    /// Returns `None` once both channels are closed or released.
    pub async fn next_change(&mut self) -> Option<DetailChange> {
        loop {
            if self.post_events.is_none() && self.comment_events.is_none() {
                return None;
            }

            let change = tokio::select! {
                event = recv_or_pending(&mut self.post_events) => match event {
                    Some(event) => DetailChange::Post(event),
                    None => {
                        self.post_events = None;
                        continue;
                    }
                },
                event = recv_or_pending(&mut self.comment_events) => match event {
                    Some(event) => DetailChange::Comment(event),
                    None => {
                        self.comment_events = None;
                        continue;
                    }
                },
            };

            if self.is_relevant(&change) {
                return Some(change);
            }
        }
    }

    /// Wait for one relevant event and apply it. Returns false once both channels are gone.
    pub async fn process_next(&mut self) -> bool {
        match self.next_change().await {
            Some(change) => {
                self.apply(change);
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued on either channel; returns how many
    /// concerned the active post
    pub fn drain_pending(&mut self) -> usize {
        let mut queued = Vec::new();
        while let Some(event) = self.post_events.as_mut().and_then(|s| s.try_recv()) {
            queued.push(DetailChange::Post(event));
        }
        while let Some(event) = self.comment_events.as_mut().and_then(|s| s.try_recv()) {
            queued.push(DetailChange::Comment(event));
        }

        let mut applied = 0;
        for change in queued {
            if self.is_relevant(&change) {
                self.apply(change);
                applied += 1;
            }
        }
        applied
    }

    fn loaded_id(&self) -> Result<i64, ViewError> {
        self.post.as_ref().map(|p| p.id).ok_or(ViewError::NotLoaded)
    }

    /// Add one cheer and show the count the store returns
    pub async fn cheer(&mut self) -> Result<&Post, ViewError> {
        let id = self.loaded_id()?;
        let updated = self.backend.posts.increment_cheer(id).await?;
        tracing::debug!("Post #{} now has {} cheer(s)", id, updated.cheer_count);
        Ok(&*self.post.insert(updated))
    }

    /// Submit a comment under the session's author label.
    ///
    /// Blank text is rejected without contacting the store. The comment is
    /// not added to `comments` here; the channel delivers it.
    pub async fn add_comment(&mut self, text: &str) -> Result<Comment, ViewError> {
        if text.trim().is_empty() {
            return Err(ViewError::ValidationRejected(
                "Comment must not be empty".to_string(),
            ));
        }
        let post_id = self.post_id.ok_or(ViewError::NotLoaded)?;

        let input = CreateCommentInput::new(post_id, self.session.author_label(), text);
        Ok(self.backend.comments.create(input).await?)
    }

    /// Enter edit mode with the current post in the draft
    pub fn begin_edit(&mut self) -> Result<&mut PostDraft, ViewError> {
        let post = self.post.as_ref().ok_or(ViewError::NotLoaded)?;
        Ok(self.draft.insert(PostDraft::from_post(post)))
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&PostDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut PostDraft> {
        self.draft.as_mut()
    }

    /// Save the draft; the stored result replaces the local post and edit
    /// mode ends. On failure the draft is kept.
    pub async fn save_edit(&mut self) -> Result<&Post, ViewError> {
        let id = self.loaded_id()?;
        let input = self
            .draft
            .as_ref()
            .ok_or(ViewError::NotLoaded)?
            .to_update_input()?;

        let updated = self.backend.posts.update(id, input).await?;
        tracing::info!("Updated post #{}", id);
        self.draft = None;
        Ok(&*self.post.insert(updated))
    }

    /// Delete the post. On success the consumer should return to the feed.
    pub async fn delete_post(&mut self) -> Result<Navigation, ViewError> {
        let id = self.loaded_id()?;
        self.backend.posts.delete(id).await?;
        tracing::info!("Deleted post #{}", id);
        Ok(Navigation::Feed)
    }

    /// Release both channels. Safe to call more than once.
    pub fn teardown(&mut self) {
        let released = self.post_events.take().map(Subscription::unsubscribe).is_some()
            | self.comment_events.take().map(Subscription::unsubscribe).is_some();
        if released {
            tracing::debug!("Detail released its subscriptions");
        }
    }

    pub fn post_id(&self) -> Option<i64> {
        self.post_id
    }

    /// `None` while loading, or forever if the post does not exist
    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// The posts channel reported this post deleted
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Showing fallback content after a failed read
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_live(&self) -> bool {
        self.post_events.is_some() || self.comment_events.is_some()
    }
}

impl std::fmt::Debug for DetailViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailViewModel")
            .field("post_id", &self.post_id)
            .field("loaded", &self.post.is_some())
            .field("comments", &self.comments.len())
            .field("editing", &self.is_editing())
            .field("removed", &self.removed)
            .field("degraded", &self.degraded)
            .finish()
    }
}
