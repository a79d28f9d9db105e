use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app::notifications::{NotificationQueue, QueueSettings};
use crate::app::scratch_cards::ScratchCardRegistry;
use crate::app::toasts::ToastFeed;
use crate::domain::scratch::SurfaceConfig;
use crate::infra::store::KeyValueStore;
use crate::jobs::promotions;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub queue: QueueSettings,
    pub promotion_interval: Duration,
    pub surface: SurfaceConfig,
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            queue: QueueSettings::default(),
            promotion_interval: promotions::DEFAULT_PROMOTION_INTERVAL,
            surface: SurfaceConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimitReached;

impl fmt::Display for SessionLimitReached {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("live session limit reached")
    }
}

impl std::error::Error for SessionLimitReached {}

/// Everything owned by one signed-in user for the lifetime of a session.
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub started_at: OffsetDateTime,
    pub queue: Arc<Mutex<NotificationQueue>>,
    pub toasts: Arc<ToastFeed>,
    pub scratch_cards: Mutex<ScratchCardRegistry>,
    cancel: CancellationToken,
    /// Milliseconds since the registry epoch.
    last_seen_ms: AtomicU64,
}

impl Session {
    fn close(&self) {
        self.cancel.cancel();
    }

    fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms.load(Ordering::Relaxed)
    }

    fn touch(&self, now_ms: u64) {
        self.last_seen_ms.fetch_max(now_ms, Ordering::Relaxed);
    }
}

/// Live sessions, keyed by session token. One session per user; a new
/// login supersedes the previous one.
pub struct SessionRegistry {
    store: Arc<dyn KeyValueStore>,
    settings: SessionSettings,
    epoch: Instant,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: SessionSettings) -> Self {
        Self {
            store,
            settings,
            epoch: Instant::now(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Starts a fresh session for `user_id` with a new token. Any session the
    /// user already had is ended first.
    pub async fn start(&self, user_id: Uuid) -> Result<Arc<Session>, SessionLimitReached> {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(previous) = take_user_session(&mut sessions, user_id) {
                previous.close();
                tracing::info!(user_id = %user_id, "previous session superseded");
            }
            if sessions.len() >= self.settings.max_sessions {
                tracing::warn!(user_id = %user_id, "session limit reached");
                return Err(SessionLimitReached);
            }
        }

        // store round trips happen without holding the registry lock
        let toasts = Arc::new(ToastFeed::new());
        let queue = NotificationQueue::load(
            user_id,
            self.store.clone(),
            toasts.clone(),
            self.settings.queue,
        )
        .await;

        let mut sessions = self.sessions.write().await;
        if let Some(raced) = take_user_session(&mut sessions, user_id) {
            raced.close();
            tracing::info!(user_id = %user_id, "concurrent session superseded");
        }
        if sessions.len() >= self.settings.max_sessions {
            tracing::warn!(user_id = %user_id, "session limit reached");
            return Err(SessionLimitReached);
        }

        let queue = Arc::new(Mutex::new(queue));
        let cancel = CancellationToken::new();
        promotions::spawn(queue.clone(), self.settings.promotion_interval, cancel.clone());

        let session = Arc::new(Session {
            token: Uuid::new_v4(),
            user_id,
            started_at: OffsetDateTime::now_utc(),
            queue,
            toasts,
            scratch_cards: Mutex::new(ScratchCardRegistry::new(self.settings.surface)),
            cancel,
            last_seen_ms: AtomicU64::new(self.now_ms()),
        });
        sessions.insert(session.token, session.clone());

        tracing::info!(user_id = %user_id, "session started");
        Ok(session)
    }

    /// Looks up a session and marks it as seen.
    pub async fn get(&self, token: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&token).cloned()?;
        session.touch(self.now_ms());
        Some(session)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .await
            .values()
            .find(|session| session.user_id == user_id)
            .cloned()
    }

    /// Ends a session, stopping its promotion job. Returns false if unknown.
    pub async fn end(&self, token: Uuid) -> bool {
        let Some(session) = self.sessions.write().await.remove(&token) else {
            return false;
        };
        session.close();
        tracing::info!(user_id = %session.user_id, "session ended");
        true
    }

    /// Ends every session idle for at least the idle timeout. Returns how
    /// many were ended.
    pub async fn expire_idle(&self) -> usize {
        let timeout_ms = duration_ms(self.settings.idle_timeout);
        let now_ms = self.now_ms();

        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|session| now_ms.saturating_sub(session.last_seen_ms()) >= timeout_ms)
            .map(|session| session.token)
            .collect();

        for token in &expired {
            if let Some(session) = sessions.remove(token) {
                session.close();
                tracing::info!(user_id = %session.user_id, "idle session expired");
            }
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ends every session.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.write().await;
        for session in sessions.values() {
            session.close();
        }
        tracing::info!(count = sessions.len(), "sessions closed");
        sessions.clear();
    }

    fn now_ms(&self) -> u64 {
        duration_ms(self.epoch.elapsed())
    }
}

fn take_user_session(
    sessions: &mut HashMap<Uuid, Arc<Session>>,
    user_id: Uuid,
) -> Option<Arc<Session>> {
    let token = sessions
        .values()
        .find(|session| session.user_id == user_id)
        .map(|session| session.token)?;
    sessions.remove(&token)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
