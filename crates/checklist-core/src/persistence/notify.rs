//! User-facing persistence notifications.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

/// What happened to a logical load or save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Save succeeded (possibly after retries)
    Saved,
    /// Load failed for good
    ConnectionError,
    /// Save failed for good
    SaveFailed,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Saved => "saved",
            NotificationKind::ConnectionError => "connection_error",
            NotificationKind::SaveFailed => "save_failed",
        }
    }
}

/// Blocking notification shown to the clinician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn saved() -> Self {
        Self {
            kind: NotificationKind::Saved,
            title: "Saved".into(),
            description: "Your answers have been saved.".into(),
        }
    }

    pub fn connection_error() -> Self {
        Self {
            kind: NotificationKind::ConnectionError,
            title: "Connection error".into(),
            description: "We couldn't load your checklist. Check your connection and try again."
                .into(),
        }
    }

    pub fn save_failed() -> Self {
        Self {
            kind: NotificationKind::SaveFailed,
            title: "Save failed".into(),
            description:
                "Your answers could not be saved. Stay on this page and submit again when your connection is back."
                    .into(),
        }
    }

    /// True for the two terminal failure kinds.
    pub fn is_failure(&self) -> bool {
        self.kind != NotificationKind::Saved
    }
}

/// Receives notifications. Delivery transport belongs to the host.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// Collects notifications in memory for the host to drain.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: RefCell<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        self.entries.take()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of recorded notifications of `kind`.
    pub fn count(&self, kind: NotificationKind) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, notification: Notification) {
        self.entries.borrow_mut().push(notification);
    }
}
