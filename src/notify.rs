//! User-facing notifications (toasts).

use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NetworkError,
    AuthError,
    PermissionError,
    Error(String),
    Success(String),
    Info(String),
}

impl Notification {
    pub fn text(&self) -> &str {
        match self {
            Self::NetworkError => "Cannot connect to server. Please check your internet connection.",
            Self::AuthError => "Your session has expired. Please login again.",
            Self::PermissionError => "You do not have permission to perform this action.",
            Self::Error(msg) | Self::Success(msg) | Self::Info(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool { !matches!(self, Self::Success(_) | Self::Info(_)) }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Sends notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            warn!(message = notification.text(), "notification");
        } else {
            info!(message = notification.text(), "notification");
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self { Self::default() }

    pub fn take(&self) -> Vec<Notification> {
        self.seen.lock().map(|mut seen| std::mem::take(&mut *seen)).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}
