//! Notifications
//!
//! User-visible notices are emitted on a channel and rendered elsewhere.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::trace;

/// Notice severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// An action succeeded.
    Success,

    /// Neutral information.
    Info,

    /// Something was degraded but the session continues.
    Warning,

    /// An action failed.
    Error,
}

/// A user-visible notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity.
    pub severity: Severity,

    /// Message text.
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self.severity {
            Severity::Success => "✅",
            Severity::Info => "ℹ️",
            Severity::Warning => "⚠️",
            Severity::Error => "❌",
        };

        write!(f, "{icon} {}", self.message)
    }
}

/// Sending half of the notification channel.
///
/// Sending never fails: once the receiver is gone notices are dropped.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<UnboundedSender<Notification>>,
}

impl Notifier {
    /// Creates a connected notifier and its receiver.
    #[must_use]
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();

        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that drops everything.
    #[must_use]
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Emits a notice.
    pub fn notify(&self, severity: Severity, message: impl Into<String>) {
        let notification = Notification {
            severity,
            message: message.into(),
        };

        let Some(tx) = &self.tx else {
            return;
        };

        if let Err(err) = tx.send(notification) {
            trace!(message = %err.0.message, "notification receiver dropped");
        }
    }

    /// Emits a success notice.
    pub fn success(&self, message: impl Into<String>) {
        self.notify(Severity::Success, message);
    }

    /// Emits an info notice.
    pub fn info(&self, message: impl Into<String>) {
        self.notify(Severity::Info, message);
    }

    /// Emits a warning.
    pub fn warning(&self, message: impl Into<String>) {
        self.notify(Severity::Warning, message);
    }

    /// Emits an error notice.
    pub fn error(&self, message: impl Into<String>) {
        self.notify(Severity::Error, message);
    }
}
