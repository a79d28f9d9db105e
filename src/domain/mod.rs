pub mod notification;
pub mod random;
pub mod scratch;
