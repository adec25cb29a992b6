//! Feed filter and sort criteria
//!
//! Criteria are ephemeral: they live in the feed view model and reset when
//! the feed is activated again.

use serde::{Deserialize, Serialize};

use super::Category;

/// Sort order for the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Descending creation timestamp
    #[default]
    Newest,
    /// Ascending creation timestamp
    Oldest,
    /// Descending cheer count
    Cheers,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Cheers => "cheers",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "cheers" => Ok(Self::Cheers),
            _ => Err(format!("Invalid sort key: {}", s)),
        }
    }
}

/// Search and category filter for the feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCriteria {
    /// Matched case-insensitively against titles; empty means no filter
    #[serde(default)]
    pub search: String,
    /// `None` means no category restriction
    #[serde(default)]
    pub category: Option<Category>,
}

impl FeedCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// True when neither filter is active
    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.category.is_none()
    }
}
