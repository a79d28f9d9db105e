pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod jobs;

use std::sync::Arc;

use anyhow::Result;

use crate::app::referrals::ReferralService;
use crate::app::sessions::SessionRegistry;
use crate::config::{AppConfig, StoreBackend};
use crate::infra::{cache::RedisCache, store::KeyValueStore, store::MemoryStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub sessions: Arc<SessionRegistry>,
    pub referrals: ReferralService,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(
                store.clone(),
                config.session_settings(),
            )),
            referrals: ReferralService::new(store.clone(), config.referral_reward_amount),
            admin_token: config.admin_token.clone(),
            store,
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store_backend {
            StoreBackend::Redis => Arc::new(RedisCache::connect(&config.redis_url).await?),
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store, data will not survive restarts");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(config, store))
    }
}
