//! Owner notifications.
//!
//! The engine hands a [`Notification`] to a [`Notifier`] after a committed
//! effective status change and after a comment from someone other than the
//! owner. Implementations must return immediately and swallow their own
//! failures: delivery is at-most-once, never retried, and never affects the
//! operation that triggered it.

use crate::domain::{Issue, Status, User};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub address: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Tell the owner their issue moved to `to`, mentioning any score change.
    pub fn status_changed(address: &str, owner: &User, issue: &Issue, to: Status, trust_delta: Option<f64>) -> Self {
        let mut body = format!(
            "Hello {},\n\nYour issue '{}' is now: {}.",
            owner.full_name,
            issue.title,
            to.label()
        );
        match trust_delta {
            Some(delta) if delta > 0.0 => body.push_str(&format!(
                "\n\nYou earned +{} Trust Point for a valid issue!",
                delta
            )),
            Some(delta) if delta < 0.0 => body.push_str(&format!(
                "\n\nYour Trust Score decreased by {} due to an invalid report.",
                delta.abs()
            )),
            _ => {}
        }

        Self {
            address: address.to_string(),
            subject: format!("CampusFix: Issue Updated to {}", to.label()),
            body,
        }
    }

    /// Tell the owner someone commented on their issue.
    pub fn comment_added(address: &str, author: &User, issue: &Issue, text: &str) -> Self {
        Self {
            address: address.to_string(),
            subject: format!("New Comment on '{}'", issue.title),
            body: format!("Hello,\n\n{} commented: \"{}\"", author.full_name, text),
        }
    }
}

/// Fire-and-forget delivery of notifications.
pub trait Notifier: Send + Sync {
    /// Schedule delivery. Must not block and must not fail the caller.
    fn notify(&self, notification: Notification);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(to = %notification.address, subject = %notification.subject, "notification dropped");
    }
}

/// Records notifications in memory instead of delivering them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far, in order.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification);
    }
}
