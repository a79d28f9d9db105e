use std::sync::Arc;
use std::time::Duration;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use ulid::Generator;
use uuid::Uuid;

use crate::app::toasts::ToastSink;
use crate::domain::notification::{
    decode_records, encode_records, NotificationDraft, NotificationKind, NotificationRecord,
    Priority, PromotionalThrottle, TransactionOutcome,
};
use crate::domain::random::RandomSource;
use crate::infra::keys;
use crate::infra::store::KeyValueStore;

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_PROMOTION_COOLDOWN: Duration = Duration::from_secs(30 * 60);

pub struct PromotionTemplate {
    pub title: &'static str,
    pub message: &'static str,
    pub priority: Priority,
    pub action_url: &'static str,
    pub action_label: &'static str,
}

pub const PROMOTION_TEMPLATES: [PromotionTemplate; 3] = [
    PromotionTemplate {
        title: "Special Offer!",
        message: "Get 20% extra cashback on your next recharge. Limited time offer!",
        priority: Priority::Medium,
        action_url: "/offers",
        action_label: "View Offers",
    },
    PromotionTemplate {
        title: "Referral Bonus",
        message: "Invite 3 friends and earn ₹150 bonus. Start sharing your referral code!",
        priority: Priority::Low,
        action_url: "/referrals",
        action_label: "Refer Now",
    },
    PromotionTemplate {
        title: "Daily Rewards",
        message: "Don't forget to check your daily scratch cards for exciting prizes!",
        priority: Priority::Low,
        action_url: "/recharge",
        action_label: "Play Now",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub toast_duration: Duration,
    pub promotion_cooldown: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            toast_duration: DEFAULT_TOAST_DURATION,
            promotion_cooldown: DEFAULT_PROMOTION_COOLDOWN,
        }
    }
}

/// Newest-first notification list for one user session.
///
/// The in-memory list is authoritative. Every mutation writes the whole list
/// back to the store; write failures are logged and otherwise ignored.
pub struct NotificationQueue {
    user_id: Uuid,
    records: Vec<NotificationRecord>,
    throttle: PromotionalThrottle,
    ids: Generator,
    store: Arc<dyn KeyValueStore>,
    toasts: Arc<dyn ToastSink>,
    settings: QueueSettings,
}

impl NotificationQueue {
    /// Rehydrates the user's queue. Unreadable data yields an empty queue.
    pub async fn load(
        user_id: Uuid,
        store: Arc<dyn KeyValueStore>,
        toasts: Arc<dyn ToastSink>,
        settings: QueueSettings,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let records = match store.get(&keys::notifications(user_id)).await {
            Ok(Some(payload)) => match decode_records(&payload) {
                Ok(records) => records
                    .into_iter()
                    .filter(|record| !record.is_expired(now))
                    .collect(),
                Err(err) => {
                    tracing::error!(error = ?err, user_id = %user_id, "failed to parse stored notifications");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::error!(error = ?err, user_id = %user_id, "failed to load notifications");
                Vec::new()
            }
        };

        let mut throttle = PromotionalThrottle::new(cooldown(settings.promotion_cooldown));
        match store.get(&keys::last_promotion(user_id)).await {
            Ok(Some(value)) => match OffsetDateTime::parse(&value, &Rfc3339) {
                Ok(last) => throttle.last_fired_at = Some(last),
                Err(err) => {
                    tracing::warn!(error = ?err, user_id = %user_id, "ignoring unreadable promotion timestamp")
                }
            },
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = ?err, user_id = %user_id, "failed to load promotion timestamp")
            }
        }

        tracing::debug!(user_id = %user_id, count = records.len(), "notification queue loaded");

        Self {
            user_id,
            records,
            throttle,
            ids: Generator::new(),
            store,
            toasts,
            settings,
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|record| !record.read).count()
    }

    pub fn last_promotion_at(&self) -> Option<OffsetDateTime> {
        self.throttle.last_fired_at
    }

    pub async fn add_notification(&mut self, draft: NotificationDraft) -> NotificationRecord {
        let record = NotificationRecord {
            id: self.next_id(),
            title: draft.title,
            message: draft.message,
            kind: draft.kind,
            priority: draft.priority,
            read: false,
            created_at: OffsetDateTime::now_utc(),
            action: draft.action,
            expires_at: draft.expires_at,
        };

        if record.priority == Priority::High {
            self.toasts
                .show(&record.title, &record.message, self.settings.toast_duration);
        }

        tracing::debug!(
            user_id = %self.user_id,
            notification_id = %record.id,
            kind = record.kind.as_str(),
            priority = record.priority.as_str(),
            "notification added"
        );

        self.records.insert(0, record.clone());
        self.persist().await;
        record
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    /// Returns whether a record changed. Already-read and unknown ids both
    /// leave the queue untouched.
    pub async fn mark_as_read(&mut self, id: &str) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return false;
        };
        if record.read {
            return false;
        }
        record.read = true;
        self.persist().await;
        true
    }

    /// Returns how many records changed.
    pub async fn mark_all_as_read(&mut self) -> usize {
        let mut changed = 0;
        for record in self.records.iter_mut().filter(|record| !record.read) {
            record.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.persist().await;
        }
        changed
    }

    pub async fn remove_notification(&mut self, id: &str) -> bool {
        let Some(index) = self.records.iter().position(|record| record.id == id) else {
            return false;
        };
        self.records.remove(index);
        self.persist().await;
        true
    }

    pub async fn clear_all(&mut self) {
        self.records.clear();
        self.persist().await;
    }

    /// Adds a random promotional notification unless the cooldown is running.
    pub async fn maybe_inject_promotion(
        &mut self,
        now: OffsetDateTime,
        rng: &mut dyn RandomSource,
    ) -> Option<NotificationRecord> {
        if !self.throttle.ready(now) {
            tracing::debug!(user_id = %self.user_id, "promotion skipped, cooldown running");
            return None;
        }

        let index = rng.pick(PROMOTION_TEMPLATES.len()) % PROMOTION_TEMPLATES.len();
        let template = &PROMOTION_TEMPLATES[index];
        let draft = NotificationDraft::new(
            template.title,
            template.message,
            NotificationKind::Promotional,
            template.priority,
        )
        .with_action(template.action_url, template.action_label);

        let record = self.add_notification(draft).await;
        self.throttle.record(now);
        self.persist_throttle().await;
        Some(record)
    }

    pub async fn notify_transaction(
        &mut self,
        outcome: TransactionOutcome,
        amount: u64,
        destination: &str,
    ) -> NotificationRecord {
        self.add_notification(outcome.draft(amount, destination)).await
    }

    pub async fn notify_offer(
        &mut self,
        title: &str,
        message: &str,
        action_url: Option<&str>,
    ) -> NotificationRecord {
        let mut draft =
            NotificationDraft::new(title, message, NotificationKind::Offer, Priority::Medium);
        if let Some(url) = action_url {
            draft = draft.with_action(url, "View Offer");
        }
        self.add_notification(draft).await
    }

    pub async fn notify_system(
        &mut self,
        title: &str,
        message: &str,
        priority: Priority,
    ) -> NotificationRecord {
        self.add_notification(NotificationDraft::new(
            title,
            message,
            NotificationKind::System,
            priority,
        ))
        .await
    }

    fn next_id(&mut self) -> String {
        match self.ids.generate() {
            Ok(id) => id.to_string(),
            // only fails when the random part overflows within one millisecond
            Err(_) => ulid::Ulid::new().to_string(),
        }
    }

    async fn persist(&self) {
        let payload = match encode_records(&self.records) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = ?err, user_id = %self.user_id, "failed to encode notifications");
                return;
            }
        };

        if let Err(err) = self
            .store
            .set(&keys::notifications(self.user_id), &payload)
            .await
        {
            tracing::warn!(error = ?err, user_id = %self.user_id, "failed to persist notifications");
        }
    }

    async fn persist_throttle(&self) {
        let Some(last) = self.throttle.last_fired_at else {
            return;
        };
        let value = match last.format(&Rfc3339) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(error = ?err, "failed to format promotion timestamp");
                return;
            }
        };
        if let Err(err) = self
            .store
            .set(&keys::last_promotion(self.user_id), &value)
            .await
        {
            tracing::warn!(error = ?err, user_id = %self.user_id, "failed to persist promotion timestamp");
        }
    }
}

fn cooldown(duration: Duration) -> time::Duration {
    time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}
