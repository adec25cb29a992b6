//! Demonstration content shown when reads fail
//!
//! The same two posts seed an empty store when `backend.seed_demo` is set.

use chrono::{DateTime, Duration, Utc};

use crate::models::{CreatePostInput, Post, TagSet};

const RUN_TITLE: &str = "Amazing 10K Run This Morning!";
const RUN_CONTENT: &str = "Just completed my fastest 10K ever! The weather was perfect and I felt incredible throughout the entire run.";
const RUN_IMAGE: &str = "https://images.unsplash.com/photo-1571019613454-1cb2f99b2d8b?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80";

const SHOES_TITLE: &str = "New Running Shoes Review";
const SHOES_CONTENT: &str = "Just got my hands on the latest Nike Air Zoom. These shoes are incredible for long-distance runs!";
const SHOES_IMAGE: &str = "https://images.unsplash.com/photo-1542291026-7eec264c27ff?ixlib=rb-4.0.3&auto=format&fit=crop&w=800&q=80";

fn run_post(id: i64, now: DateTime<Utc>) -> Post {
    Post {
        id,
        title: RUN_TITLE.to_string(),
        content: RUN_CONTENT.to_string(),
        image_url: Some(RUN_IMAGE.to_string()),
        tags: TagSet::from_iter(["10K", "Training"]),
        cheer_count: 24,
        comment_count: 5,
        created_at: now - Duration::hours(2),
    }
}

fn shoes_post(now: DateTime<Utc>) -> Post {
    Post {
        id: 2,
        title: SHOES_TITLE.to_string(),
        content: SHOES_CONTENT.to_string(),
        image_url: Some(SHOES_IMAGE.to_string()),
        tags: TagSet::from_iter(["Gear", "Shoes"]),
        cheer_count: 15,
        comment_count: 3,
        created_at: now - Duration::hours(4),
    }
}

/// Feed shown when the post list cannot be fetched, newest first
pub fn fallback_feed(now: DateTime<Utc>) -> Vec<Post> {
    vec![run_post(1, now), shoes_post(now)]
}

/// Detail post shown when `id` cannot be fetched. Carries no comment count.
pub fn fallback_post(id: i64, now: DateTime<Utc>) -> Post {
    Post {
        comment_count: 0,
        ..run_post(id, now)
    }
}

/// Inputs that recreate the fallback feed in a store, with their cheer counts
pub fn demo_posts(now: DateTime<Utc>) -> Vec<(CreatePostInput, u32)> {
    fallback_feed(now)
        .into_iter()
        .map(|post| {
            let mut input = CreatePostInput::new(post.title, post.content)
                .with_tags(post.tags.iter())
                .with_created_at(post.created_at);
            input.image_url = post.image_url;
            (input, post.cheer_count)
        })
        .collect()
}
