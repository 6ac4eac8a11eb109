//! LightLedger - Points & Progression Ledger
//!
//! The gamification core of a patient community application. Tracks "Light"
//! point earnings from daily login streaks, community actions, knowledge
//! sharing, and photo challenges; rolls them into a per-user lifetime total;
//! maps that total to a progression tier; and unlocks achievements.
//!
//! All calendar-day logic (streak continuity, daily caps, one claim per day)
//! is evaluated against UTC dates.

pub mod auth;
pub mod notify;
pub mod points;
pub mod storage;

// Re-export commonly used types
pub use auth::{IdentityProvider, StaticIdentity};
pub use notify::{AwardNotice, LogNotifier, Notifier, NullNotifier};
pub use points::challenges::ChallengeTracker;
pub use points::engine::{AwardEngine, AwardOutcome, AwardRequest};
pub use points::limiter::CommunityActionLimiter;
pub use points::streak::DailyStreakTracker;
pub use points::summary::{PointsSummary, SummaryReader};
pub use points::types::{ActionType, LedgerError};
pub use storage::database::Database;
