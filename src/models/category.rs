//! Category model
//!
//! Categories are a fixed catalog. Each one owns a list of predefined tags;
//! filtering a feed by category keeps posts carrying at least one of them.

use serde::{Deserialize, Serialize};

/// Feed category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Nutrition,
    Runs,
    Gear,
    Experience,
    Community,
}

impl Category {
    /// Every category, in catalog order
    pub const ALL: [Category; 5] = [
        Category::Nutrition,
        Category::Runs,
        Category::Gear,
        Category::Experience,
        Category::Community,
    ];

    /// Tags belonging to this category
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Category::Nutrition => &["Nutrition", "Hydration", "Pre-Run", "Post-Run"],
            Category::Runs => &["5K", "10K", "Half Marathon", "Marathon"],
            Category::Gear => &["Shoes", "Clothing", "Watches"],
            Category::Experience => &["Training", "Race Day", "Recovery"],
            Category::Community => &["Events", "Groups", "Challenges"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Nutrition => "nutrition",
            Category::Runs => "runs",
            Category::Gear => "gear",
            Category::Experience => "experience",
            Category::Community => "community",
        }
    }

    /// Find the category a predefined tag belongs to
    pub fn for_tag(tag: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.tags().contains(&tag))
    }

    /// Parse a category selector.
    ///
    /// An empty selector or `none` means no category restriction.
    pub fn parse_selector(s: &str) -> Result<Option<Category>, String> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nutrition" => Ok(Self::Nutrition),
            "runs" => Ok(Self::Runs),
            "gear" => Ok(Self::Gear),
            "experience" => Ok(Self::Experience),
            "community" => Ok(Self::Community),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_roundtrip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
        assert!("shoes".parse::<Category>().is_err());
    }

    #[test]
    fn test_parse_selector_none() {
        assert_eq!(Category::parse_selector(""), Ok(None));
        assert_eq!(Category::parse_selector("None"), Ok(None));
        assert_eq!(Category::parse_selector("Gear"), Ok(Some(Category::Gear)));
        assert!(Category::parse_selector("bogus").is_err());
    }

    #[test]
    fn test_for_tag() {
        assert_eq!(Category::for_tag("10K"), Some(Category::Runs));
        assert_eq!(Category::for_tag("Race Day"), Some(Category::Experience));
        assert_eq!(Category::for_tag("Sunrise"), None);
    }

    #[test]
    fn test_catalog_tags_are_unique() {
        let mut all: Vec<&str> = Category::ALL.iter().flat_map(|c| c.tags().iter().copied()).collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
