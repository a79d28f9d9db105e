pub mod notifications;
pub mod referrals;
pub mod scratch_cards;
pub mod sessions;
pub mod toasts;
