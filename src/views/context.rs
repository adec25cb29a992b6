//! Per-session state shared by every screen
//!
//! Built once per app session and handed to each view model constructor.
//! The theme lives in a `watch` channel so renderers can await changes.

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::{SessionConfig, ThemeMode};

#[derive(Debug, Clone)]
pub struct SessionContext {
    theme: Arc<watch::Sender<ThemeMode>>,
    author_label: String,
    fallback_on_read_error: bool,
}

impl SessionContext {
    pub fn new(theme: ThemeMode, author_label: impl Into<String>) -> Self {
        let (theme, _) = watch::channel(theme);
        Self {
            theme: Arc::new(theme),
            author_label: author_label.into(),
            fallback_on_read_error: true,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.theme, config.author_label.clone())
            .with_fallback(config.fallback_on_read_error)
    }

    /// Whether failed reads show demonstration content instead of nothing
    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_on_read_error = enabled;
        self
    }

    pub fn theme(&self) -> ThemeMode {
        *self.theme.borrow()
    }

    pub fn set_theme(&self, mode: ThemeMode) {
        self.theme.send_replace(mode);
    }

    /// Flip light/dark; returns the new mode
    pub fn toggle_theme(&self) -> ThemeMode {
        self.theme.send_modify(|mode| *mode = mode.toggled());
        let mode = self.theme();
        tracing::debug!("Theme switched to {}", mode.as_str());
        mode
    }

    /// Receiver notified on every theme change
    pub fn watch_theme(&self) -> watch::Receiver<ThemeMode> {
        self.theme.subscribe()
    }

    /// Author attached to comments written in this session
    pub fn author_label(&self) -> &str {
        &self.author_label
    }

    pub fn fallback_on_read_error(&self) -> bool {
        self.fallback_on_read_error
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}
