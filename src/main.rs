//! Stride - headless feed monitor
//!
//! Loads the feed from the configured backend, prints it, then follows the
//! posts channel until Ctrl+C.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stride::{
    config::Config,
    db,
    views::{FeedViewModel, SessionContext},
};

fn print_feed(feed: &FeedViewModel) -> Result<()> {
    let cards = feed.cards(Utc::now());
    println!("{}", serde_json::to_string_pretty(&cards)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env(&Config::default_path())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Stride feed monitor...");

    let backend = db::create_backend(&config.backend).await?;
    let session = SessionContext::from_config(&config.session);
    tracing::info!(
        "Session ready: author={}, theme={}",
        session.author_label(),
        session.theme().as_str()
    );

    let mut feed = FeedViewModel::new(backend, session);
    feed.initialize()
        .await
        .context("Failed to open the posts channel")?;
    if feed.is_degraded() {
        tracing::warn!("Backend unreachable, showing demonstration posts");
    }
    print_feed(&feed)?;

    loop {
        tokio::select! {
            change = feed.next_change() => {
                let Some(change) = change else {
                    tracing::warn!("Posts channel closed");
                    break;
                };
                tracing::info!("Post #{} {}", change.id(), change.kind());
                feed.apply(change);
                print_feed(&feed)?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    feed.teardown();
    Ok(())
}
