//! Ledger persistence operations.
//!
//! Every mutation of shared state (the per-user aggregate and the per-day
//! counters) is a single guarded SQL statement, so two overlapping requests
//! can never both read the same "before" value and lose an increment. The
//! cap check and the counter increment are one statement; the daily-claim
//! idempotency guard is the primary key on (user, date).

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::points::types::{
    Achievement, AchievementCategory, ActionType, ChallengeProgress, CommunityActionCounter,
    DailyActivityRecord, Metadata, PointsTransaction, Rarity, RequirementType, StreakState,
    UserTierState,
};
use crate::storage::database::DatabaseError;

/// Store over a borrowed connection; constructed per operation so callers
/// can run it inside their own transaction.
pub struct LedgerStore<'a> {
    conn: &'a Connection,
}

impl<'a> LedgerStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ========== Points transactions (append-only) ==========

    /// Append a transaction row. The ledger is append-only; there is no
    /// update or delete counterpart.
    pub fn insert_transaction(
        &self,
        user_id: Uuid,
        action_type: ActionType,
        points_amount: i64,
        source_id: Option<&str>,
        source_type: Option<&str>,
        metadata: &Metadata,
    ) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        let metadata_json = serde_json::to_string(metadata)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO points_transactions
             (id, user_id, action_type, points_amount, source_id, source_type, metadata_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.to_string(),
                user_id.to_string(),
                action_type.as_str(),
                points_amount,
                source_id,
                source_type,
                metadata_json,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(id)
    }

    /// Most recent transactions for a user, newest first.
    pub fn recent_transactions(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<PointsTransaction>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, action_type, points_amount, source_id, source_type,
                    metadata_json, created_at
             FROM points_transactions
             WHERE user_id = ?1
             ORDER BY created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), limit], parse_transaction_row)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?.into_transaction()?);
        }

        Ok(transactions)
    }

    /// Net Light moved through the ledger for a user on the given date.
    pub fn light_earned_on(&self, user_id: Uuid, date: NaiveDate) -> Result<i64, DatabaseError> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(points_amount), 0) FROM points_transactions
             WHERE user_id = ?1 AND substr(created_at, 1, 10) = ?2",
            params![user_id.to_string(), date.to_string()],
            |row| row.get(0),
        )?;

        Ok(total)
    }

    /// Count of transactions for a user (history views, tests).
    pub fn transaction_count(&self, user_id: Uuid) -> Result<usize, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM points_transactions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    // ========== User tier aggregate ==========

    /// Atomically add `delta` to the user's lifetime total and return the
    /// new total. Creates the aggregate row on first award. The total is
    /// clamped at zero; it can only drop below a prior value through an
    /// explicit negative award.
    pub fn add_to_total(&self, user_id: Uuid, delta: i64) -> Result<i64, DatabaseError> {
        let new_total: i64 = self.conn.query_row(
            "INSERT INTO user_tiers (user_id, total_light, current_tier, tier_achieved_at)
             VALUES (?1, MAX(0, ?2), 1, ?3)
             ON CONFLICT(user_id) DO UPDATE SET total_light = MAX(0, total_light + ?2)
             RETURNING total_light",
            params![user_id.to_string(), delta, Utc::now().to_rfc3339()],
            |row| row.get(0),
        )?;

        Ok(new_total)
    }

    /// Persist the derived tier. The achieved timestamp moves only when the
    /// tier actually changes. Returns true if the tier changed.
    pub fn set_tier(&self, user_id: Uuid, tier: u8) -> Result<bool, DatabaseError> {
        let rows = self.conn.execute(
            "UPDATE user_tiers SET current_tier = ?2, tier_achieved_at = ?3
             WHERE user_id = ?1 AND current_tier <> ?2",
            params![user_id.to_string(), tier, Utc::now().to_rfc3339()],
        )?;

        Ok(rows > 0)
    }

    /// Current aggregate state for a user, if any award has ever landed.
    pub fn tier_state(&self, user_id: Uuid) -> Result<Option<UserTierState>, DatabaseError> {
        let result = self
            .conn
            .query_row(
                "SELECT user_id, total_light, current_tier, tier_achieved_at
                 FROM user_tiers WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, u8>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match result {
            Some((user, total_light, current_tier, achieved_at)) => Ok(Some(UserTierState {
                user_id: parse_uuid(&user)?,
                total_light,
                current_tier,
                tier_achieved_at: parse_timestamp(&achieved_at)?,
            })),
            None => Ok(None),
        }
    }

    // ========== Daily activities ==========

    /// Insert the daily activity row for a claim. Fails with `Conflict` if
    /// the user already has a row for that date, which doubles as the
    /// race guard for concurrent claims.
    pub fn insert_daily_activity(
        &self,
        user_id: Uuid,
        activity_date: NaiveDate,
        activities: &Metadata,
        daily_light_earned: i64,
        streak_bonus: i64,
    ) -> Result<(), DatabaseError> {
        let activities_json = serde_json::to_string(activities)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let result = self.conn.execute(
            "INSERT INTO daily_activities
             (user_id, activity_date, activities_json, daily_light_earned, streak_bonus, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id.to_string(),
                activity_date.to_string(),
                activities_json,
                daily_light_earned,
                streak_bonus,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(DatabaseError::Conflict(format!(
                "daily activity for {} on {}",
                user_id, activity_date
            ))),
            Err(e) => Err(DatabaseError::Sqlite(e)),
        }
    }

    /// Look up the activity row for a specific date (idempotency and
    /// streak-continuity checks).
    pub fn daily_activity_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyActivityRecord>, DatabaseError> {
        let result = self
            .conn
            .query_row(
                "SELECT user_id, activity_date, activities_json, daily_light_earned,
                        streak_bonus, created_at
                 FROM daily_activities WHERE user_id = ?1 AND activity_date = ?2",
                params![user_id.to_string(), date.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        match result {
            Some((user, date, activities_json, daily_light_earned, streak_bonus, created_at)) => {
                Ok(Some(DailyActivityRecord {
                    user_id: parse_uuid(&user)?,
                    activity_date: parse_date(&date)?,
                    activities: serde_json::from_str(&activities_json)
                        .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
                    daily_light_earned,
                    streak_bonus,
                    created_at: parse_timestamp(&created_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    // ========== Profile streak state ==========

    /// Streak state for a user; zeroed defaults before the first claim.
    pub fn streak_state(&self, user_id: Uuid) -> Result<StreakState, DatabaseError> {
        let result = self
            .conn
            .query_row(
                "SELECT streak_count, longest_streak, last_active_date
                 FROM profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        match result {
            Some((current_streak, longest_streak, last_active)) => Ok(StreakState {
                current_streak,
                longest_streak,
                last_active_date: last_active.as_deref().map(parse_date).transpose()?,
            }),
            None => Ok(StreakState::default()),
        }
    }

    /// Persist streak count, longest streak, and last active date together.
    pub fn update_streak(
        &self,
        user_id: Uuid,
        current_streak: u32,
        longest_streak: u32,
        last_active_date: NaiveDate,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO profiles (user_id, streak_count, longest_streak, last_active_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 streak_count = ?2, longest_streak = ?3, last_active_date = ?4",
            params![
                user_id.to_string(),
                current_streak,
                longest_streak,
                last_active_date.to_string(),
            ],
        )?;

        Ok(())
    }

    // ========== Community action counters ==========

    /// Increment the (user, action, date) counter unless the cap is already
    /// reached. The guard and the increment are a single statement, so of N
    /// concurrent attempts past cap K exactly K succeed. Returns the new
    /// count, or None when the cap refused the increment.
    pub fn increment_community_action(
        &self,
        user_id: Uuid,
        action_type: ActionType,
        date: NaiveDate,
        max_daily: u32,
        light_per_action: i64,
    ) -> Result<Option<u32>, DatabaseError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO community_actions
             (user_id, action_type, action_date, daily_count, light_earned)
             VALUES (?1, ?2, ?3, 0, 0)",
            params![user_id.to_string(), action_type.as_str(), date.to_string()],
        )?;

        let new_count = self
            .conn
            .query_row(
                "UPDATE community_actions
                 SET daily_count = daily_count + 1, light_earned = light_earned + ?5
                 WHERE user_id = ?1 AND action_type = ?2 AND action_date = ?3
                   AND daily_count < ?4
                 RETURNING daily_count",
                params![
                    user_id.to_string(),
                    action_type.as_str(),
                    date.to_string(),
                    max_daily,
                    light_per_action,
                ],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;

        Ok(new_count)
    }

    /// Counter for one (user, action, date); zero if no row yet.
    pub fn community_count(
        &self,
        user_id: Uuid,
        action_type: ActionType,
        date: NaiveDate,
    ) -> Result<u32, DatabaseError> {
        let count = self
            .conn
            .query_row(
                "SELECT daily_count FROM community_actions
                 WHERE user_id = ?1 AND action_type = ?2 AND action_date = ?3",
                params![user_id.to_string(), action_type.as_str(), date.to_string()],
                |row| row.get::<_, u32>(0),
            )
            .optional()?;

        Ok(count.unwrap_or(0))
    }

    /// All counters for a user on one date, for display.
    pub fn community_counters_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<CommunityActionCounter>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT action_type, action_date, daily_count, light_earned
             FROM community_actions WHERE user_id = ?1 AND action_date = ?2",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), date.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut counters = Vec::new();
        for row in rows {
            let (action_str, date_str, daily_count, light_earned) = row?;
            let action_type = ActionType::from_str(&action_str).ok_or_else(|| {
                DatabaseError::DeserializationError(format!("Unknown action type: {action_str}"))
            })?;
            counters.push(CommunityActionCounter {
                action_type,
                action_date: parse_date(&date_str)?,
                daily_count,
                light_earned,
            });
        }

        Ok(counters)
    }

    // ========== Achievements ==========

    /// Seed the achievement catalog. Existing rows are left untouched.
    pub fn seed_achievements(&self, achievements: &[Achievement]) -> Result<(), DatabaseError> {
        for achievement in achievements {
            self.conn.execute(
                "INSERT OR IGNORE INTO achievements
                 (id, name, description, category, requirement_type, requirement_value,
                  points_reward, rarity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    achievement.id,
                    achievement.name,
                    achievement.description,
                    achievement.category.as_str(),
                    achievement.requirement_type.as_str(),
                    achievement.requirement_value,
                    achievement.points_reward,
                    achievement.rarity.as_str(),
                ],
            )?;
        }

        Ok(())
    }

    /// Achievements the user has not unlocked yet. The exclusion is a SQL
    /// subquery, which is correct (returns the full catalog) when the
    /// unlocked set is empty. Rows with tags this build does not know are
    /// skipped; they can never unlock.
    pub fn locked_achievements(&self, user_id: Uuid) -> Result<Vec<Achievement>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, category, requirement_type, requirement_value,
                    points_reward, rarity
             FROM achievements
             WHERE id NOT IN
                 (SELECT achievement_id FROM user_achievements WHERE user_id = ?1)
             ORDER BY id",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], parse_achievement_row)?;

        let mut achievements = Vec::new();
        for row in rows {
            match row?.into_achievement() {
                Ok(achievement) => achievements.push(achievement),
                Err(DatabaseError::DeserializationError(msg)) => {
                    tracing::warn!("Skipping unrecognized achievement row: {}", msg);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(achievements)
    }

    /// Record an unlock. Idempotent: returns false if the user already has
    /// this achievement, and never double-inserts.
    pub fn insert_user_achievement(
        &self,
        user_id: Uuid,
        achievement_id: &str,
    ) -> Result<bool, DatabaseError> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![
                user_id.to_string(),
                achievement_id,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(rows > 0)
    }

    /// Achievements the user has unlocked, newest first.
    pub fn unlocked_achievements(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Achievement, DateTime<Utc>)>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.name, a.description, a.category, a.requirement_type,
                    a.requirement_value, a.points_reward, a.rarity, ua.unlocked_at
             FROM achievements a
             JOIN user_achievements ua ON a.id = ua.achievement_id
             WHERE ua.user_id = ?1
             ORDER BY ua.unlocked_at DESC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok((parse_achievement_row(row)?, row.get::<_, String>(8)?))
        })?;

        let mut unlocked = Vec::new();
        for row in rows {
            let (achievement_row, unlocked_at) = row?;
            unlocked.push((
                achievement_row.into_achievement()?,
                parse_timestamp(&unlocked_at)?,
            ));
        }

        Ok(unlocked)
    }

    // ========== Challenge progress ==========

    /// Progress for one (user, challenge), if any photo has been recorded.
    pub fn challenge_progress(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> Result<Option<ChallengeProgress>, DatabaseError> {
        let result = self
            .conn
            .query_row(
                "SELECT current_streak, longest_streak, total_photos, points_earned,
                        last_photo_date
                 FROM challenge_progress WHERE user_id = ?1 AND challenge_id = ?2",
                params![user_id.to_string(), challenge_id],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        match result {
            Some((current_streak, longest_streak, total_photos, points_earned, last_photo)) => {
                Ok(Some(ChallengeProgress {
                    current_streak,
                    longest_streak,
                    total_photos,
                    points_earned,
                    last_photo_date: last_photo.as_deref().map(parse_date).transpose()?,
                }))
            }
            None => Ok(None),
        }
    }

    /// Write the full progress row (insert or replace semantics per key).
    pub fn upsert_challenge_progress(
        &self,
        user_id: Uuid,
        challenge_id: &str,
        progress: &ChallengeProgress,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO challenge_progress
             (user_id, challenge_id, current_streak, longest_streak, total_photos,
              points_earned, last_photo_date, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(user_id, challenge_id) DO UPDATE SET
                 current_streak = ?3, longest_streak = ?4, total_photos = ?5,
                 points_earned = ?6, last_photo_date = ?7, updated_at = ?8",
            params![
                user_id.to_string(),
                challenge_id,
                progress.current_streak,
                progress.longest_streak,
                progress.total_photos,
                progress.points_earned,
                progress.last_photo_date.map(|d| d.to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Deduct from a challenge's earned points, clamped at zero.
    pub fn deduct_challenge_points(
        &self,
        user_id: Uuid,
        challenge_id: &str,
        amount: i64,
    ) -> Result<(), DatabaseError> {
        self.conn.execute(
            "UPDATE challenge_progress
             SET points_earned = MAX(0, points_earned - ?3), updated_at = ?4
             WHERE user_id = ?1 AND challenge_id = ?2",
            params![
                user_id.to_string(),
                challenge_id,
                amount,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(())
    }
}

/// Intermediate struct for reading transaction rows.
struct TransactionRow {
    id: String,
    user_id: String,
    action_type: String,
    points_amount: i64,
    source_id: Option<String>,
    source_type: Option<String>,
    metadata_json: String,
    created_at: String,
}

fn parse_transaction_row(row: &rusqlite::Row) -> rusqlite::Result<TransactionRow> {
    Ok(TransactionRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action_type: row.get(2)?,
        points_amount: row.get(3)?,
        source_id: row.get(4)?,
        source_type: row.get(5)?,
        metadata_json: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl TransactionRow {
    fn into_transaction(self) -> Result<PointsTransaction, DatabaseError> {
        let action_type = ActionType::from_str(&self.action_type).ok_or_else(|| {
            DatabaseError::DeserializationError(format!(
                "Unknown action type: {}",
                self.action_type
            ))
        })?;

        Ok(PointsTransaction {
            id: parse_uuid(&self.id)?,
            user_id: parse_uuid(&self.user_id)?,
            action_type,
            points_amount: self.points_amount,
            source_id: self.source_id,
            source_type: self.source_type,
            metadata: serde_json::from_str(&self.metadata_json)
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Intermediate struct for reading achievement rows.
struct AchievementRow {
    id: String,
    name: String,
    description: String,
    category: String,
    requirement_type: String,
    requirement_value: i64,
    points_reward: i64,
    rarity: String,
}

fn parse_achievement_row(row: &rusqlite::Row) -> rusqlite::Result<AchievementRow> {
    Ok(AchievementRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        requirement_type: row.get(4)?,
        requirement_value: row.get(5)?,
        points_reward: row.get(6)?,
        rarity: row.get(7)?,
    })
}

impl AchievementRow {
    fn into_achievement(self) -> Result<Achievement, DatabaseError> {
        let requirement_type = RequirementType::from_str(&self.requirement_type).ok_or_else(|| {
            DatabaseError::DeserializationError(format!(
                "Unknown requirement type: {}",
                self.requirement_type
            ))
        })?;
        let category = AchievementCategory::from_str(&self.category).ok_or_else(|| {
            DatabaseError::DeserializationError(format!(
                "Unknown achievement category: {}",
                self.category
            ))
        })?;
        let rarity = Rarity::from_str(&self.rarity).ok_or_else(|| {
            DatabaseError::DeserializationError(format!("Unknown rarity: {}", self.rarity))
        })?;

        Ok(Achievement {
            id: self.id,
            name: self.name,
            description: self.description,
            category,
            requirement_type,
            requirement_value: self.requirement_value,
            points_reward: self.points_reward,
            rarity,
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s)
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid date: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::DeserializationError(format!("Invalid timestamp: {e}")))
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::Database;

    #[test]
    fn test_transaction_append_and_history() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        store
            .insert_transaction(user, ActionType::DailyLogin, 10, None, None, &Metadata::new())
            .unwrap();
        store
            .insert_transaction(
                user,
                ActionType::KnowledgeShare,
                150,
                Some("strategy-1"),
                Some("relief_strategy"),
                &Metadata::new(),
            )
            .unwrap();

        let history = store.recent_transactions(user, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(store.transaction_count(user).unwrap(), 2);

        let today = Utc::now().date_naive();
        assert_eq!(store.light_earned_on(user, today).unwrap(), 160);
    }

    #[test]
    fn test_add_to_total_upserts_and_accumulates() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        assert_eq!(store.add_to_total(user, 100).unwrap(), 100);
        assert_eq!(store.add_to_total(user, 50).unwrap(), 150);
        assert_eq!(store.add_to_total(user, -30).unwrap(), 120);
        // Clamped at zero
        assert_eq!(store.add_to_total(user, -500).unwrap(), 0);
    }

    #[test]
    fn test_set_tier_only_touches_timestamp_on_change() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        store.add_to_total(user, 300).unwrap();
        assert!(store.set_tier(user, 2).unwrap());
        assert!(!store.set_tier(user, 2).unwrap());

        let state = store.tier_state(user).unwrap().unwrap();
        assert_eq!(state.current_tier, 2);
        assert_eq!(state.total_light, 300);
    }

    #[test]
    fn test_daily_activity_unique_per_date() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();
        let today = Utc::now().date_naive();

        store
            .insert_daily_activity(user, today, &Metadata::new(), 10, 0)
            .unwrap();

        let second = store.insert_daily_activity(user, today, &Metadata::new(), 10, 0);
        assert!(matches!(second, Err(DatabaseError::Conflict(_))));

        assert!(store.daily_activity_on(user, today).unwrap().is_some());
    }

    #[test]
    fn test_guarded_increment_stops_at_cap() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();
        let today = Utc::now().date_naive();

        for expected in 1..=3u32 {
            let count = store
                .increment_community_action(user, ActionType::WelcomeMember, today, 3, 25)
                .unwrap();
            assert_eq!(count, Some(expected));
        }

        // Fourth attempt is refused and the counter is untouched
        let refused = store
            .increment_community_action(user, ActionType::WelcomeMember, today, 3, 25)
            .unwrap();
        assert_eq!(refused, None);
        assert_eq!(
            store
                .community_count(user, ActionType::WelcomeMember, today)
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_user_achievement_insert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        store
            .seed_achievements(&crate::points::achievements::default_achievements())
            .unwrap();

        assert!(store.insert_user_achievement(user, "ember_keeper").unwrap());
        assert!(!store.insert_user_achievement(user, "ember_keeper").unwrap());

        let unlocked = store.unlocked_achievements(user).unwrap();
        assert_eq!(unlocked.len(), 1);
    }

    #[test]
    fn test_achievement_rows_with_unknown_tags_are_skipped() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        let catalog = crate::points::achievements::default_achievements();
        store.seed_achievements(&catalog).unwrap();

        // Rows written by a newer build: unknown requirement, category, and
        // rarity tags must all be skipped, not coerced
        for (id, category, requirement, rarity) in [
            ("future_req", "community", "photos_taken", "common"),
            ("future_cat", "seasonal", "login_streak", "common"),
            ("future_rarity", "community", "login_streak", "mythic"),
        ] {
            db.connection()
                .execute(
                    "INSERT INTO achievements
                     (id, name, description, category, requirement_type,
                      requirement_value, points_reward, rarity)
                     VALUES (?1, ?1, '', ?2, ?3, 1, 10, ?4)",
                    params![id, category, requirement, rarity],
                )
                .unwrap();
        }

        let locked = store.locked_achievements(user).unwrap();
        assert_eq!(locked.len(), catalog.len());
        assert!(locked.iter().all(|a| !a.id.starts_with("future_")));
    }

    #[test]
    fn test_locked_achievements_with_empty_unlocked_set() {
        let db = Database::open_in_memory().unwrap();
        let store = LedgerStore::new(db.connection());
        let user = Uuid::new_v4();

        let catalog = crate::points::achievements::default_achievements();
        store.seed_achievements(&catalog).unwrap();

        // Nothing unlocked yet: the full catalog must come back
        let locked = store.locked_achievements(user).unwrap();
        assert_eq!(locked.len(), catalog.len());

        store.insert_user_achievement(user, "ember_keeper").unwrap();
        let locked = store.locked_achievements(user).unwrap();
        assert_eq!(locked.len(), catalog.len() - 1);
        assert!(locked.iter().all(|a| a.id != "ember_keeper"));
    }
}
