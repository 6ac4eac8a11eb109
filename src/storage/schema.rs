//! Database schema definitions for LightLedger.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Per-user profile fields owned by the ledger (streak state)
CREATE TABLE IF NOT EXISTS profiles (
    user_id TEXT PRIMARY KEY,
    streak_count INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_active_date TEXT
);

-- Append-only log of every point award and deduction.
-- Rows are never updated or deleted; corrections are offsetting rows.
CREATE TABLE IF NOT EXISTS points_transactions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    points_amount INTEGER NOT NULL,
    source_id TEXT,
    source_type TEXT,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_points_transactions_user
    ON points_transactions(user_id, created_at);

-- Mutable per-user aggregate: lifetime total and derived tier
CREATE TABLE IF NOT EXISTS user_tiers (
    user_id TEXT PRIMARY KEY,
    total_light INTEGER NOT NULL DEFAULT 0,
    current_tier INTEGER NOT NULL DEFAULT 1,
    tier_achieved_at TEXT NOT NULL
);

-- One row per user per calendar date; presence of today's row means
-- the daily bonus has already been claimed
CREATE TABLE IF NOT EXISTS daily_activities (
    user_id TEXT NOT NULL,
    activity_date TEXT NOT NULL,
    activities_json TEXT NOT NULL,
    daily_light_earned INTEGER NOT NULL,
    streak_bonus INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, activity_date)
);

-- Per-(user, action, date) counters for capped community actions
CREATE TABLE IF NOT EXISTS community_actions (
    user_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    action_date TEXT NOT NULL,
    daily_count INTEGER NOT NULL DEFAULT 0,
    light_earned INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, action_type, action_date)
);

-- Achievement catalog
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    requirement_type TEXT NOT NULL,
    requirement_value INTEGER NOT NULL,
    points_reward INTEGER NOT NULL,
    rarity TEXT NOT NULL
);

-- Unlocked achievements per user; unlocking is one-time
CREATE TABLE IF NOT EXISTS user_achievements (
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL REFERENCES achievements(id),
    unlocked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, achievement_id)
);

-- Photo challenge progress, one row per (user, challenge)
CREATE TABLE IF NOT EXISTS challenge_progress (
    user_id TEXT NOT NULL,
    challenge_id TEXT NOT NULL,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    total_photos INTEGER NOT NULL DEFAULT 0,
    points_earned INTEGER NOT NULL DEFAULT 0,
    last_photo_date TEXT,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, challenge_id)
);
"#;

/// SQL for creating the schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;
