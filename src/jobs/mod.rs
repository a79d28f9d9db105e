pub mod promotions;
pub mod session_sweeper;
