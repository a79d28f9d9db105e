//! Storage key layout.

use uuid::Uuid;

pub fn notifications(user_id: Uuid) -> String {
    format!("notifications:{}", user_id)
}

pub fn last_promotion(user_id: Uuid) -> String {
    format!("notifications:{}:last_promo", user_id)
}

pub fn referral_stats(user_id: Uuid) -> String {
    format!("referrals:stats:{}", user_id)
}

pub fn referral_list(user_id: Uuid) -> String {
    format!("referrals:list:{}", user_id)
}

/// Pending referral lookup, keyed by the lower-cased invitee email.
pub fn pending_referral(email: &str) -> String {
    format!("referrals:pending:{}", email)
}
