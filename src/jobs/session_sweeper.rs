//! Ends sessions whose owners stopped making requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::sessions::SessionRegistry;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn(
    registry: Arc<SessionRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(registry, period, cancel))
}

pub async fn run(registry: Arc<SessionRegistry>, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "session sweeper started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("session sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let expired = registry.expire_idle().await;
                if expired > 0 {
                    tracing::info!(expired, "idle sessions swept");
                }
            }
        }
    }
}
