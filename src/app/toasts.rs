use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

/// Most toasts a session buffers before dropping the oldest.
const MAX_BUFFERED_TOASTS: usize = 20;

/// Transient surface for high-priority events. Fire-and-forget.
pub trait ToastSink: Send + Sync {
    fn show(&self, title: &str, message: &str, duration: Duration);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub duration_ms: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub shown_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Per-session toast buffer, drained by the client.
#[derive(Debug, Default)]
pub struct ToastFeed {
    pending: Mutex<VecDeque<Toast>>,
}

impl ToastFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every buffered toast and returns the ones still visible at `now`.
    pub fn take_active(&self, now: OffsetDateTime) -> Vec<Toast> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending
            .drain(..)
            .filter(|toast| toast.expires_at > now)
            .collect()
    }

    fn push(&self, toast: Toast) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.len() == MAX_BUFFERED_TOASTS {
            pending.pop_front();
        }
        pending.push_back(toast);
    }
}

impl ToastSink for ToastFeed {
    fn show(&self, title: &str, message: &str, duration: Duration) {
        let shown_at = OffsetDateTime::now_utc();
        let expires_at = shown_at + duration;
        tracing::debug!(title = title, duration_ms = duration.as_millis() as u64, "toast queued");
        self.push(Toast {
            title: title.to_string(),
            message: message.to_string(),
            duration_ms: duration.as_millis() as u64,
            shown_at,
            expires_at,
        });
    }
}
