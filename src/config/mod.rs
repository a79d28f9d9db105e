use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::app::notifications::QueueSettings;
use crate::app::sessions::SessionSettings;
use crate::domain::scratch::SurfaceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub store_backend: StoreBackend,
    pub redis_url: String,
    pub admin_token: Option<String>,
    pub promo_interval_seconds: u64,
    pub promo_cooldown_seconds: u64,
    pub toast_duration_ms: u64,
    pub referral_reward_amount: u32,
    pub session_idle_timeout_seconds: u64,
    pub session_sweep_interval_seconds: u64,
    pub max_live_sessions: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let config = Self {
            http_addr,
            store_backend: env_or_parse("STORE_BACKEND", "redis")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            promo_interval_seconds: env_or_parse("PROMO_INTERVAL_SECONDS", "300")?,
            promo_cooldown_seconds: env_or_parse("PROMO_COOLDOWN_SECONDS", "1800")?,
            toast_duration_ms: env_or_parse("TOAST_DURATION_MS", "5000")?,
            referral_reward_amount: env_or_parse("REFERRAL_REWARD_AMOUNT", "50")?,
            session_idle_timeout_seconds: env_or_parse("SESSION_IDLE_TIMEOUT_SECONDS", "1800")?,
            session_sweep_interval_seconds: env_or_parse("SESSION_SWEEP_INTERVAL_SECONDS", "60")?,
            max_live_sessions: env_or_parse("MAX_LIVE_SESSIONS", "10000")?,
        };

        if config.promo_interval_seconds == 0 {
            return Err(anyhow!("invalid PROMO_INTERVAL_SECONDS: must be positive"));
        }
        if config.session_sweep_interval_seconds == 0 {
            return Err(anyhow!("invalid SESSION_SWEEP_INTERVAL_SECONDS: must be positive"));
        }

        Ok(config)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            queue: QueueSettings {
                toast_duration: Duration::from_millis(self.toast_duration_ms),
                promotion_cooldown: Duration::from_secs(self.promo_cooldown_seconds),
            },
            promotion_interval: Duration::from_secs(self.promo_interval_seconds),
            surface: SurfaceConfig::default(),
            idle_timeout: Duration::from_secs(self.session_idle_timeout_seconds),
            max_sessions: self.max_live_sessions,
        }
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_seconds)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_values() {
        assert_eq!("redis".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn session_settings_follow_config() {
        let config = AppConfig {
            http_addr: "127.0.0.1:0".to_string(),
            store_backend: StoreBackend::Memory,
            redis_url: String::new(),
            admin_token: None,
            promo_interval_seconds: 60,
            promo_cooldown_seconds: 120,
            toast_duration_ms: 2500,
            referral_reward_amount: 50,
            session_idle_timeout_seconds: 900,
            session_sweep_interval_seconds: 30,
            max_live_sessions: 10,
        };
        let settings = config.session_settings();
        assert_eq!(settings.promotion_interval, Duration::from_secs(60));
        assert_eq!(settings.queue.promotion_cooldown, Duration::from_secs(120));
        assert_eq!(settings.queue.toast_duration, Duration::from_millis(2500));
        assert_eq!(settings.idle_timeout, Duration::from_secs(900));
        assert_eq!(settings.max_sessions, 10);
        assert_eq!(config.session_sweep_interval(), Duration::from_secs(30));
    }
}
