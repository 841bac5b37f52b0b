// Notification center - transient in-memory user notifications
//
// Newest first, read/unread tracked per entry, no persistence across runs.
// The list is bounded; once full, the oldest entries fall off the end.

use crate::cache::CollectionKey;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Maximum notifications retained before the oldest are dropped
const MAX_NOTIFICATIONS: usize = 200;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One transient user-facing notification
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    /// Collection a "view" action should jump to, when there is one
    pub action_target: Option<CollectionKey>,
}

/// Process-unique notification id
fn next_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Shared handle to the notification list
///
/// Cheap to clone: all clones share the same list.
#[derive(Clone)]
pub struct NotificationCenter {
    entries: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a notification (prepended, unread). Returns its id.
    pub fn add(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        action_target: Option<CollectionKey>,
    ) -> u64 {
        let notification = Notification {
            id: next_id(),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            action_target,
        };
        let id = notification.id;

        let mut entries = self.entries.lock().unwrap();
        entries.insert(0, notification);
        entries.truncate(MAX_NOTIFICATIONS);
        id
    }

    /// Mark a notification read. Unknown ids and already-read entries are no-ops.
    pub fn mark_read(&self, id: u64) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.iter_mut().find(|n| n.id == id) {
            entry.read = true;
        }
    }

    /// Mark every notification read
    pub fn mark_all_read(&self) {
        let mut entries = self.entries.lock().unwrap();
        for entry in entries.iter_mut() {
            entry.read = true;
        }
    }

    /// Remove a notification by id
    pub fn remove(&self, id: u64) {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|n| n.id != id);
    }

    /// Remove all notifications
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Snapshot of all notifications, newest first
    pub fn all(&self) -> Vec<Notification> {
        self.entries.lock().unwrap().clone()
    }

    /// Number of unread notifications
    pub fn unread_count(&self) -> usize {
        self.entries.lock().unwrap().iter().filter(|n| !n.read).count()
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_prepends_unread() {
        let center = NotificationCenter::new();
        center.add(NotificationKind::Info, "first", "m1", None);
        center.add(NotificationKind::Error, "second", "m2", None);

        let all = center.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "second");
        assert!(all.iter().all(|n| !n.read));
        assert_eq!(center.unread_count(), 2);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let center = NotificationCenter::new();
        let id = center.add(NotificationKind::Warning, "t", "m", None);

        center.mark_read(id);
        center.mark_read(id);
        center.mark_read(9999); // unknown id: no-op

        assert_eq!(center.unread_count(), 0);
        assert!(center.all()[0].read);
    }

    #[test]
    fn test_mark_all_and_clear() {
        let center = NotificationCenter::new();
        center.add(NotificationKind::Info, "a", "", None);
        center.add(NotificationKind::Info, "b", "", None);

        center.mark_all_read();
        assert_eq!(center.unread_count(), 0);

        center.clear();
        assert!(center.all().is_empty());
    }

    #[test]
    fn test_remove_by_id() {
        let center = NotificationCenter::new();
        let id = center.add(NotificationKind::Success, "keep", "", None);
        let gone = center.add(NotificationKind::Success, "drop", "", None);

        center.remove(gone);

        let all = center.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
    }

    #[test]
    fn test_bounded_at_capacity() {
        let center = NotificationCenter::new();
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            center.add(NotificationKind::Info, format!("n{}", i), "", None);
        }
        assert_eq!(center.all().len(), MAX_NOTIFICATIONS);
        // Newest survives at the front
        assert_eq!(center.all()[0].title, format!("n{}", MAX_NOTIFICATIONS + 4));
    }
}
