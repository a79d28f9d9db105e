pub mod cache;
pub mod keys;
pub mod store;
