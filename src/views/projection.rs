//! Filter, sort and merge helpers shared by the view models

use crate::models::{FeedCriteria, Post, Record, SortKey};

/// Whether a post passes the search term and category filter
pub fn matches(post: &Post, criteria: &FeedCriteria) -> bool {
    if !criteria.search.is_empty() && !post.title_contains(&criteria.search) {
        return false;
    }
    match criteria.category {
        Some(category) => post.tags.intersects(category.tags()),
        None => true,
    }
}

/// The posts passing `criteria`, in their current order
pub fn filter_posts(posts: &[Post], criteria: &FeedCriteria) -> Vec<Post> {
    posts
        .iter()
        .filter(|post| matches(post, criteria))
        .cloned()
        .collect()
}

/// Stable in-place sort; ties keep their relative order
pub fn sort_posts(posts: &mut [Post], key: SortKey) {
    match key {
        SortKey::Newest => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Oldest => posts.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::Cheers => posts.sort_by(|a, b| b.cheer_count.cmp(&a.cheer_count)),
    }
}

/// Put `record` at the front, or replace it in place if its id is present
pub fn upsert_front<T: Record>(items: &mut Vec<T>, record: T) {
    match items.iter_mut().find(|item| item.id() == record.id()) {
        Some(existing) => *existing = record,
        None => items.insert(0, record),
    }
}

/// Replace the item with the same id, keeping its position.
///
/// Returns false if no item matched.
pub fn replace_by_id<T: Record>(items: &mut [T], record: &T) -> bool {
    match items.iter_mut().find(|item| item.id() == record.id()) {
        Some(existing) => {
            *existing = record.clone();
            true
        }
        None => false,
    }
}

/// Remove the item with `id`; returns true if one was removed
pub fn remove_by_id<T: Record>(items: &mut Vec<T>, id: i64) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::{Category, TagSet};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const TITLES: &[&str] = &[
        "Amazing 10K Run",
        "Shoe Review",
        "Race day nerves",
        "Recovery smoothie",
        "Track tuesday",
        "Half marathon PR",
    ];

    const TAGS: &[&str] = &["10K", "Shoes", "Recovery", "Hydration", "Events", "Misc"];

    fn posts_strategy() -> impl Strategy<Value = Vec<Post>> {
        prop::collection::vec(
            (
                prop::sample::select(TITLES),
                0u32..10,
                prop::collection::vec(prop::sample::select(TAGS), 0..3),
            ),
            0..12,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, cheers, tags))| Post {
                    id: i as i64 + 1,
                    title: title.to_string(),
                    content: String::new(),
                    image_url: None,
                    tags: tags.into_iter().collect::<TagSet>(),
                    cheer_count: cheers,
                    comment_count: 0,
                    // Distinct timestamps in shuffled order
                    created_at: Utc.timestamp_opt(((i as i64 * 7919) % 101) * 60, 0).unwrap(),
                })
                .collect()
        })
    }

    fn category_strategy() -> impl Strategy<Value = Option<Category>> {
        prop_oneof![Just(None), prop::sample::select(Category::ALL.to_vec()).prop_map(Some)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Search yields exactly the matching subsequence, in order.
        #[test]
        fn property_search_is_subsequence(
            posts in posts_strategy(),
            term in prop::sample::select(vec!["10k", "RUN", "review", "a", "zzz"]),
        ) {
            let visible = filter_posts(&posts, &FeedCriteria::new().with_search(term));
            let expected: Vec<Post> = posts
                .iter()
                .filter(|p| p.title.to_lowercase().contains(&term.to_lowercase()))
                .cloned()
                .collect();
            prop_assert_eq!(visible, expected);
        }

        /// Category filter keeps exactly the posts with an overlapping tag.
        #[test]
        fn property_category_filter(posts in posts_strategy(), category in category_strategy()) {
            let visible = filter_posts(&posts, &FeedCriteria::new().with_category(category));
            match category {
                None => {
                    prop_assert_eq!(visible, posts);
                }
                Some(category) => {
                    let expected: Vec<Post> = posts
                        .iter()
                        .filter(|p| p.tags.iter().any(|t| category.tags().contains(&t)))
                        .cloned()
                        .collect();
                    prop_assert_eq!(visible, expected);
                }
            }
        }

        /// Newest then oldest yields the exact reverse.
        #[test]
        fn property_newest_oldest_reverse(posts in posts_strategy()) {
            let mut newest = posts.clone();
            sort_posts(&mut newest, SortKey::Newest);
            let mut oldest = newest.clone();
            sort_posts(&mut oldest, SortKey::Oldest);

            oldest.reverse();
            prop_assert_eq!(newest, oldest);
        }

        /// Cheer sort keeps the prior order among equal counts.
        #[test]
        fn property_cheer_sort_stable(posts in posts_strategy()) {
            let mut sorted = posts.clone();
            sort_posts(&mut sorted, SortKey::Cheers);

            for pair in sorted.windows(2) {
                prop_assert!(pair[0].cheer_count >= pair[1].cheer_count);
                if pair[0].cheer_count == pair[1].cheer_count {
                    let first = posts.iter().position(|p| p.id == pair[0].id);
                    let second = posts.iter().position(|p| p.id == pair[1].id);
                    prop_assert!(first < second);
                }
            }
        }
    }
}
