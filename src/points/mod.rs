//! Points & progression domain
//!
//! The award engine, daily streak tracker, community action limiter, tier
//! resolver, achievement evaluator, and photo-challenge earnings.

pub mod achievements;
pub mod catalog;
pub mod challenges;
pub mod engine;
pub mod limiter;
pub mod streak;
pub mod summary;
pub mod tiers;
pub mod types;

// Re-export commonly used types
pub use types::*;
