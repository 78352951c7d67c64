pub mod analyze;
pub mod filter;
pub mod pull;
pub mod schedule;
pub mod status;
