//! Post form state: creation screen and detail edit mode

use crate::gateway::Backend;
use crate::models::{Category, CreatePostInput, Post, TagSet, UpdatePostInput};

use super::{Navigation, ViewError};

/// Editable fields of a post
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    /// Empty means no image
    pub image_url: String,
    pub tags: TagSet,
}

impl PostDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-filled from a stored post
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            image_url: post.image_url.clone().unwrap_or_default(),
            tags: post.tags.clone(),
        }
    }

    /// Add a tag; returns false if it is empty or already present
    pub fn add_tag(&mut self, tag: &str) -> bool {
        self.tags.insert(tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    /// Select or deselect a catalog tag; returns whether it is now selected
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.tags.remove(tag) {
            false
        } else {
            self.tags.insert(tag)
        }
    }

    fn validate(&self) -> Result<(), ViewError> {
        if self.title.trim().is_empty() {
            return Err(ViewError::ValidationRejected(
                "Title is required".to_string(),
            ));
        }
        Ok(())
    }

    fn image(&self) -> Option<String> {
        let url = self.image_url.trim();
        (!url.is_empty()).then(|| url.to_string())
    }

    /// Validated creation input
    pub fn to_create_input(&self) -> Result<CreatePostInput, ViewError> {
        self.validate()?;
        Ok(CreatePostInput {
            title: self.title.clone(),
            content: self.content.clone(),
            image_url: self.image(),
            tags: self.tags.clone(),
            created_at: None,
        })
    }

    /// Validated update writing every editable field
    pub fn to_update_input(&self) -> Result<UpdatePostInput, ViewError> {
        self.validate()?;
        Ok(UpdatePostInput::new()
            .with_title(self.title.clone())
            .with_content(self.content.clone())
            .with_image_url(self.image())
            .with_tags(self.tags.clone()))
    }
}

/// Creation screen
pub struct PostComposer {
    backend: Backend,
    draft: PostDraft,
    custom_tag: String,
}

impl PostComposer {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            draft: PostDraft::new(),
            custom_tag: String::new(),
        }
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut PostDraft {
        &mut self.draft
    }

    /// Tag picker contents, grouped by category
    pub fn catalog(&self) -> impl Iterator<Item = (Category, &'static [&'static str])> {
        Category::ALL.into_iter().map(|c| (c, c.tags()))
    }

    /// Text typed into the custom tag box
    pub fn set_custom_tag(&mut self, text: impl Into<String>) {
        self.custom_tag = text.into();
    }

    pub fn custom_tag(&self) -> &str {
        &self.custom_tag
    }

    /// Add the custom tag text, trimmed, and clear the box.
    ///
    /// Returns false (keeping the text) if it was blank or already present.
    pub fn commit_custom_tag(&mut self) -> bool {
        let tag = self.custom_tag.trim().to_string();
        if self.draft.add_tag(&tag) {
            self.custom_tag.clear();
            true
        } else {
            false
        }
    }

    /// Validate and create the post.
    ///
    /// On success the form resets and the consumer should return to the feed.
    /// On failure the form is kept as typed.
    pub async fn submit(&mut self) -> Result<Navigation, ViewError> {
        let input = self.draft.to_create_input()?;
        let post = self.backend.posts.create(input).await?;
        tracing::info!("Created post #{}: {}", post.id, post.title);

        self.draft = PostDraft::new();
        self.custom_tag.clear();
        Ok(Navigation::Feed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::gateway::{GatewayError, PostGateway};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, PostComposer) {
        let store = Arc::new(MemoryStore::new());
        let composer = PostComposer::new(Backend::from_store(store.clone()));
        (store, composer)
    }

    #[test]
    fn test_toggle_tag() {
        let mut draft = PostDraft::new();
        assert!(draft.toggle_tag("10K"));
        assert!(draft.toggle_tag("Shoes"));
        assert!(!draft.toggle_tag("10K"));
        assert_eq!(draft.tags.iter().collect::<Vec<_>>(), vec!["Shoes"]);
    }

    #[test]
    fn test_custom_tag_is_trimmed_and_deduplicated() {
        let (_store, mut composer) = setup();

        composer.set_custom_tag("  Trail  ");
        assert!(composer.commit_custom_tag());
        assert_eq!(composer.custom_tag(), "");
        assert!(composer.draft().tags.contains("Trail"));

        composer.set_custom_tag("Trail");
        assert!(!composer.commit_custom_tag());
        composer.set_custom_tag("   ");
        assert!(!composer.commit_custom_tag());
        assert_eq!(composer.draft().tags.len(), 1);
    }

    #[test]
    fn test_catalog_lists_every_category() {
        let (_store, composer) = setup();
        let catalog: Vec<_> = composer.catalog().collect();
        assert_eq!(catalog.len(), 5);
        assert!(catalog
            .iter()
            .any(|(c, tags)| *c == Category::Gear && tags.contains(&"Watches")));
    }

    #[test]
    fn test_blank_image_url_becomes_none() {
        let draft = PostDraft {
            title: "Run".to_string(),
            image_url: "   ".to_string(),
            ..Default::default()
        };
        assert_eq!(draft.to_create_input().unwrap().image_url, None);
    }

    #[tokio::test]
    async fn test_submit_requires_title() {
        let (store, mut composer) = setup();
        composer.draft_mut().title = "   ".to_string();
        composer.draft_mut().content = "body".to_string();

        let result = composer.submit().await;

        assert!(matches!(result, Err(ViewError::ValidationRejected(_))));
        assert!(store.list_all().await.unwrap().is_empty());
        assert_eq!(composer.draft().content, "body");
    }

    #[tokio::test]
    async fn test_submit_creates_and_resets() {
        let (store, mut composer) = setup();
        composer.draft_mut().title = "Long run".to_string();
        composer.draft_mut().toggle_tag("Marathon");

        let nav = composer.submit().await.unwrap();

        assert_eq!(nav, Navigation::Feed);
        assert_eq!(composer.draft(), &PostDraft::new());
        let posts = store.list_all().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Long run");
        assert!(posts[0].tags.contains("Marathon"));
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_form() {
        let (store, mut composer) = setup();
        store.set_online(false);
        composer.draft_mut().title = "Long run".to_string();

        let result = composer.submit().await;

        assert!(matches!(
            result,
            Err(ViewError::Gateway(GatewayError::BackendUnavailable(_)))
        ));
        assert_eq!(composer.draft().title, "Long run");
    }
}
