use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Offer,
    Transaction,
    Promotional,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Transaction => "transaction",
            Self::Promotional => "promotional",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Call to action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRef {
    pub url: String,
    pub label: String,
}

impl ActionRef {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionRef>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
}

impl NotificationRecord {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Caller-supplied part of a notification; the queue fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub priority: Priority,
    #[serde(default)]
    pub action: Option<ActionRef>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl NotificationDraft {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
        priority: Priority,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            priority,
            action: None,
            expires_at: None,
        }
    }

    pub fn with_action(mut self, url: impl Into<String>, label: impl Into<String>) -> Self {
        self.action = Some(ActionRef::new(url, label));
        self
    }

    pub fn expiring_at(mut self, expires_at: OffsetDateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionOutcome {
    Success,
    Failed,
    Pending,
}

impl TransactionOutcome {
    pub fn draft(&self, amount: u64, destination: &str) -> NotificationDraft {
        let (title, message, priority) = match self {
            Self::Success => (
                "Recharge Successful",
                format!(
                    "Your recharge of ₹{} for {} has been completed successfully.",
                    amount, destination
                ),
                Priority::High,
            ),
            Self::Failed => (
                "Recharge Failed",
                format!(
                    "Your recharge of ₹{} for {} could not be processed. Please try again.",
                    amount, destination
                ),
                Priority::High,
            ),
            Self::Pending => (
                "Recharge Processing",
                format!(
                    "Your recharge of ₹{} for {} is being processed. You'll be notified once completed.",
                    amount, destination
                ),
                Priority::Medium,
            ),
        };

        NotificationDraft::new(title, message, NotificationKind::Transaction, priority)
            .with_action("/dashboard", "View Details")
    }
}

/// Cooldown gate for synthetic promotional notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionalThrottle {
    pub last_fired_at: Option<OffsetDateTime>,
    pub cooldown: time::Duration,
}

impl PromotionalThrottle {
    pub fn new(cooldown: time::Duration) -> Self {
        Self {
            last_fired_at: None,
            cooldown,
        }
    }

    pub fn ready(&self, now: OffsetDateTime) -> bool {
        match self.last_fired_at {
            Some(last) => now - last >= self.cooldown,
            None => true,
        }
    }

    pub fn record(&mut self, now: OffsetDateTime) {
        self.last_fired_at = Some(now);
    }
}

pub fn encode_records(records: &[NotificationRecord]) -> serde_json::Result<String> {
    serde_json::to_string(records)
}

/// Parses a persisted list, skipping entries that do not deserialize.
///
/// Fails only when the payload is not a JSON array at all.
pub fn decode_records(payload: &str) -> serde_json::Result<Vec<NotificationRecord>> {
    let entries: Vec<Value> = serde_json::from_str(payload)?;
    let total = entries.len();
    let records: Vec<NotificationRecord> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();

    if records.len() < total {
        tracing::debug!(
            dropped = total - records.len(),
            "skipped malformed notification records"
        );
    }

    Ok(records)
}
