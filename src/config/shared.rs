//! Atomically swappable configuration snapshot.

use std::sync::Arc;

use parking_lot::RwLock;

use super::WelcomeConfig;

/// Handle to the current [`WelcomeConfig`].
///
/// Readers take an `Arc` snapshot and keep it for the whole event, so a
/// concurrent [`replace`](Self::replace) is only seen by later events.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Arc<WelcomeConfig>>>,
}

impl SharedConfig {
    pub fn new(config: WelcomeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Current configuration.
    pub fn snapshot(&self) -> Arc<WelcomeConfig> {
        self.inner.read().clone()
    }

    /// Swap in a new configuration wholesale.
    pub fn replace(&self, config: WelcomeConfig) {
        *self.inner.write() = Arc::new(config);
    }
}
