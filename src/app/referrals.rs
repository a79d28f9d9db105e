use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::infra::keys;
use crate::infra::store::KeyValueStore;

pub const DEFAULT_REWARD_AMOUNT: u32 = 50;
const CODE_PREFIX: &str = "REF";
const CODE_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Completed,
    Rewarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    pub referral_code: String,
    pub total_referrals: u32,
    pub successful_referrals: u32,
    pub total_rewards_earned: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_email: String,
    pub referral_code: String,
    pub status: ReferralStatus,
    pub reward_amount: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

/// Where a pending referral lives, indexed by invitee email.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PendingPointer {
    referrer_id: Uuid,
    referral_id: Uuid,
}

#[derive(Debug)]
pub enum SendReferralError {
    InvalidEmail,
    AlreadyPending,
    Store(anyhow::Error),
}

impl fmt::Display for SendReferralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => f.write_str("invalid email"),
            Self::AlreadyPending => f.write_str("a referral is already pending for this email"),
            Self::Store(err) => write!(f, "referral storage failed: {}", err),
        }
    }
}

impl std::error::Error for SendReferralError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(&**err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for SendReferralError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}

/// Referral codes, invitations and reward bookkeeping.
///
/// Reads and writes are plain get/set pairs with no cross-key atomicity.
#[derive(Clone)]
pub struct ReferralService {
    store: Arc<dyn KeyValueStore>,
    reward_amount: u32,
}

impl ReferralService {
    pub fn new(store: Arc<dyn KeyValueStore>, reward_amount: u32) -> Self {
        Self {
            store,
            reward_amount,
        }
    }

    /// Loads the user's stats, creating them with a fresh code on first use.
    pub async fn stats(&self, user_id: Uuid) -> Result<ReferralStats> {
        if let Some(stats) = self.read(&keys::referral_stats(user_id)).await? {
            return Ok(stats);
        }

        let now = OffsetDateTime::now_utc();
        let stats = ReferralStats {
            referral_code: generate_referral_code(),
            total_referrals: 0,
            successful_referrals: 0,
            total_rewards_earned: 0,
            created_at: now,
            updated_at: now,
        };
        self.write(&keys::referral_stats(user_id), &stats).await?;

        tracing::info!(user_id = %user_id, code = %stats.referral_code, "referral code created");
        Ok(stats)
    }

    /// The user's referrals, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<Referral>> {
        Ok(self
            .read(&keys::referral_list(user_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn send_referral(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<Referral, SendReferralError> {
        let email = normalize_email(email).ok_or(SendReferralError::InvalidEmail)?;

        let pending_key = keys::pending_referral(&email);
        if self.read::<PendingPointer>(&pending_key).await?.is_some() {
            return Err(SendReferralError::AlreadyPending);
        }

        let mut stats = self.stats(user_id).await?;
        let now = OffsetDateTime::now_utc();
        let referral = Referral {
            id: Uuid::new_v4(),
            referrer_id: user_id,
            referred_email: email,
            referral_code: stats.referral_code.clone(),
            status: ReferralStatus::Pending,
            reward_amount: self.reward_amount,
            created_at: now,
            completed_at: None,
        };

        let mut referrals = self.list(user_id).await?;
        referrals.insert(0, referral.clone());
        self.write(&keys::referral_list(user_id), &referrals).await?;
        self.write(
            &pending_key,
            &PendingPointer {
                referrer_id: user_id,
                referral_id: referral.id,
            },
        )
        .await?;

        stats.total_referrals += 1;
        stats.updated_at = now;
        self.write(&keys::referral_stats(user_id), &stats).await?;

        tracing::info!(
            user_id = %user_id,
            referral_id = %referral.id,
            "referral sent"
        );
        Ok(referral)
    }

    /// Completes the pending referral for `referred_email` and credits the
    /// referrer. Returns `None` when nothing is pending for that email.
    pub async fn process_reward(&self, referred_email: &str) -> Result<Option<Referral>> {
        let Some(email) = normalize_email(referred_email) else {
            return Ok(None);
        };
        let pending_key = keys::pending_referral(&email);
        let Some(pointer) = self.read::<PendingPointer>(&pending_key).await? else {
            return Ok(None);
        };

        let mut referrals = self.list(pointer.referrer_id).await?;
        let now = OffsetDateTime::now_utc();
        let Some(referral) = referrals
            .iter_mut()
            .find(|referral| referral.id == pointer.referral_id)
        else {
            tracing::warn!(
                referral_id = %pointer.referral_id,
                "dangling pending referral pointer, dropping"
            );
            self.store.delete(&pending_key).await?;
            return Ok(None);
        };

        if referral.status != ReferralStatus::Pending {
            self.store.delete(&pending_key).await?;
            return Ok(None);
        }

        referral.status = ReferralStatus::Completed;
        referral.completed_at = Some(now);
        let completed = referral.clone();

        self.write(&keys::referral_list(pointer.referrer_id), &referrals)
            .await?;
        self.store.delete(&pending_key).await?;

        let mut stats = self.stats(pointer.referrer_id).await?;
        stats.successful_referrals += 1;
        stats.total_rewards_earned += u64::from(completed.reward_amount);
        stats.updated_at = now;
        self.write(&keys::referral_stats(pointer.referrer_id), &stats)
            .await?;

        tracing::info!(
            referrer_id = %pointer.referrer_id,
            referral_id = %completed.id,
            reward = completed.reward_amount,
            "referral reward credited"
        );
        Ok(Some(completed))
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|err| anyhow!("corrupt value at {}: {}", key, err)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.store.set(key, &payload).await
    }
}

pub fn generate_referral_code() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();
    format!("{}{}", CODE_PREFIX, suffix)
}

fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || email.contains(' ') {
        return None;
    }
    Some(email)
}
