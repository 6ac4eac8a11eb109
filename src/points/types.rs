//! Core types for the points ledger.
//!
//! Defines the closed set of point-earning actions, transaction and
//! aggregate records, achievements, and the ledger error taxonomy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::database::DatabaseError;

/// Open key-value metadata attached to a transaction.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Every action that can move Light through the ledger.
///
/// The `as_str` tags are the persisted wire values. Counted community
/// actions (caps enforced by the limiter) are a subset; the rest carry
/// dynamically computed point values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Daily login bonus claim
    DailyLogin,
    /// Send support to a member in a symptom flare
    SupportMember,
    /// React to a post in the vent channel
    VentReaction,
    /// Welcome a new member
    WelcomeMember,
    /// Upvote a helpful research link
    ResearchUpvote,
    /// Share a relief strategy that worked
    KnowledgeShare,
    /// Complete the onboarding profile
    ProfileCompletion,
    /// Submit a photo-challenge capture
    PhotoCapture,
    /// Form a new connection (first message)
    AllianceFormed,
    /// Point reward for unlocking an achievement
    AchievementUnlock,
    /// Deduction for generating a time-lapse before the challenge ends
    EarlyTimelapsePenalty,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::DailyLogin => "daily_defiance",
            ActionType::SupportMember => "beacon_hope",
            ActionType::VentReaction => "silence_whispers",
            ActionType::WelcomeMember => "reinforce_resistance",
            ActionType::ResearchUpvote => "expose_deceit",
            ActionType::KnowledgeShare => "forbidden_knowledge",
            ActionType::ProfileCompletion => "forge_armor",
            ActionType::PhotoCapture => "daily_photo_capture",
            ActionType::AllianceFormed => "forge_alliance",
            ActionType::AchievementUnlock => "achievement_unlock",
            ActionType::EarlyTimelapsePenalty => "early_timelapse_penalty",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily_defiance" => Some(ActionType::DailyLogin),
            "beacon_hope" => Some(ActionType::SupportMember),
            "silence_whispers" => Some(ActionType::VentReaction),
            "reinforce_resistance" => Some(ActionType::WelcomeMember),
            "expose_deceit" => Some(ActionType::ResearchUpvote),
            "forbidden_knowledge" => Some(ActionType::KnowledgeShare),
            "forge_armor" => Some(ActionType::ProfileCompletion),
            "daily_photo_capture" => Some(ActionType::PhotoCapture),
            "forge_alliance" => Some(ActionType::AllianceFormed),
            "achievement_unlock" => Some(ActionType::AchievementUnlock),
            "early_timelapse_penalty" => Some(ActionType::EarlyTimelapsePenalty),
            _ => None,
        }
    }

    /// Human-readable title for notifications and history views.
    pub fn title(&self) -> &'static str {
        match self {
            ActionType::DailyLogin => "Daily Login",
            ActionType::SupportMember => "Supporting Others",
            ActionType::VentReaction => "Community Engagement",
            ActionType::WelcomeMember => "Welcoming New Members",
            ActionType::ResearchUpvote => "Curating Research",
            ActionType::KnowledgeShare => "Sharing Knowledge",
            ActionType::ProfileCompletion => "Profile Completion",
            ActionType::PhotoCapture => "Photo Challenge",
            ActionType::AllianceFormed => "Forging an Alliance",
            ActionType::AchievementUnlock => "Achievement Unlock",
            ActionType::EarlyTimelapsePenalty => "Early Time-lapse Penalty",
        }
    }

    /// Whether an award of this action is evaluated for achievement unlocks.
    ///
    /// Achievement rewards and penalties are non-triggering, which bounds
    /// the award -> unlock -> award recursion at depth one.
    pub fn triggers_achievements(&self) -> bool {
        !matches!(
            self,
            ActionType::AchievementUnlock | ActionType::EarlyTimelapsePenalty
        )
    }
}

/// Immutable record of one award or deduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action_type: ActionType,
    /// Signed; negative for penalties.
    pub points_amount: i64,
    pub source_id: Option<String>,
    pub source_type: Option<String>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Mutable per-user aggregate: lifetime total and derived tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTierState {
    pub user_id: Uuid,
    pub total_light: i64,
    pub current_tier: u8,
    pub tier_achieved_at: DateTime<Utc>,
}

/// One row per user per calendar date; records the daily bonus claim.
#[derive(Debug, Clone)]
pub struct DailyActivityRecord {
    pub user_id: Uuid,
    pub activity_date: NaiveDate,
    pub activities: Metadata,
    pub daily_light_earned: i64,
    pub streak_bonus: i64,
    pub created_at: DateTime<Utc>,
}

/// Streak state embedded in the user's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
}

/// Per-(user, action, date) counter for capped community actions.
#[derive(Debug, Clone)]
pub struct CommunityActionCounter {
    pub action_type: ActionType,
    pub action_date: NaiveDate,
    pub daily_count: u32,
    pub light_earned: i64,
}

/// Achievement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    /// Login streak milestones
    Consistency,
    /// Knowledge sharing and community contribution
    Community,
    /// Onboarding and profile milestones
    Profile,
}

impl AchievementCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementCategory::Consistency => "consistency",
            AchievementCategory::Community => "community",
            AchievementCategory::Profile => "profile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "consistency" => Some(AchievementCategory::Consistency),
            "community" => Some(AchievementCategory::Community),
            "profile" => Some(AchievementCategory::Profile),
            _ => None,
        }
    }
}

/// Achievement requirement, as a closed enum so evaluation is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    /// Consecutive daily login days
    LoginStreak,
    /// Relief strategies shared
    TipsShared,
    /// Profile completion percentage
    ProfileCompletion,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::LoginStreak => "login_streak",
            RequirementType::TipsShared => "tips_shared",
            RequirementType::ProfileCompletion => "profile_completion",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "login_streak" => Some(RequirementType::LoginStreak),
            "tips_shared" => Some(RequirementType::TipsShared),
            "profile_completion" => Some(RequirementType::ProfileCompletion),
            _ => None,
        }
    }
}

/// Achievement rarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "common" => Some(Rarity::Common),
            "rare" => Some(Rarity::Rare),
            "epic" => Some(Rarity::Epic),
            "legendary" => Some(Rarity::Legendary),
            _ => None,
        }
    }
}

/// Achievement catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub requirement_type: RequirementType,
    pub requirement_value: i64,
    pub points_reward: i64,
    pub rarity: Rarity,
}

/// An achievement a user has unlocked.
#[derive(Debug, Clone)]
pub struct UnlockedAchievement {
    pub achievement: Achievement,
    pub unlocked_at: DateTime<Utc>,
}

/// Photo challenge progress, one row per (user, challenge).
#[derive(Debug, Clone, Default)]
pub struct ChallengeProgress {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_photos: u32,
    pub points_earned: i64,
    pub last_photo_date: Option<NaiveDate>,
}

/// Ledger errors.
///
/// The first four variants are expected control flow, reported synchronously
/// with no retry. `Store` is the only class that warrants a caller-side
/// retry of the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Daily limit reached for {action} ({max_daily}/day)", action = .action.as_str())]
    CapReached { action: ActionType, max_daily: u32 },

    #[error("Daily bonus already claimed today")]
    AlreadyClaimedToday,

    #[error("Invalid action type: {0}")]
    InvalidAction(String),

    #[error("Store failure: {0}")]
    Store(#[from] DatabaseError),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::Store(DatabaseError::Sqlite(e))
    }
}
