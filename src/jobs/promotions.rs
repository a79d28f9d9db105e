//! Periodic promotional notifications for a live session.
//!
//! Each session gets its own task. The task ticks on a fixed interval and
//! asks the session's queue to inject a promotion; the queue's throttle
//! decides whether one is actually added. The task stops when the session's
//! [`CancellationToken`] is cancelled.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::notifications::NotificationQueue;
use crate::domain::random::ThreadRandom;

pub const DEFAULT_PROMOTION_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub fn spawn(
    queue: Arc<Mutex<NotificationQueue>>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(queue, period, cancel))
}

pub async fn run(queue: Arc<Mutex<NotificationQueue>>, period: Duration, cancel: CancellationToken) {
    let user_id = queue.lock().await.user_id();
    tracing::info!(
        user_id = %user_id,
        interval_secs = period.as_secs(),
        "promotion job started"
    );

    // first tick one full period after start
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(user_id = %user_id, "promotion job stopping");
                break;
            }
            _ = ticker.tick() => {
                let mut queue = queue.lock().await;
                let mut rng = ThreadRandom;
                if let Some(record) = queue
                    .maybe_inject_promotion(OffsetDateTime::now_utc(), &mut rng)
                    .await
                {
                    tracing::debug!(
                        user_id = %user_id,
                        notification_id = %record.id,
                        "promotion injected"
                    );
                }
            }
        }
    }
}
