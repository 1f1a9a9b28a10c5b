//! Transient user-facing notifications (toasts).
//!
//! Fetch and toggle failures are reported here instead of aborting the
//! screen. The CLI logs them; tests collect them.

use std::sync::Mutex;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    /// How long the toast stays on screen.
    pub ttl: Duration,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            ttl: DEFAULT_TTL,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Emits notifications as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Info => info!("{}", notification.message),
            Level::Error => warn!("{}", notification.message),
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct Toasts {
    shown: Mutex<Vec<Notification>>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.lock())
    }

    pub fn errors(&self) -> usize {
        self.lock().iter().filter(|n| n.level == Level::Error).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        // A poisoned toast list is still a valid list.
        self.shown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for Toasts {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}
