//! Daily login streak tracking and bonus claims.
//!
//! One claim per UTC calendar day. The bonus is `10 + min(prior_streak * 5, 30)`:
//! it is keyed off the streak *before* today's claim increments it, so the
//! first day of a fresh streak pays the base 10 and the bonus tops out at 30
//! once the prior streak reaches six days. A single missed day resets the
//! counter to 1 on the next claim.
//!
//! The activity record, the profile streak update, and the points award are
//! one SQL transaction; a partial failure leaves no trace of the claim.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::points::engine::{AwardEngine, AwardRequest};
use crate::points::types::{ActionType, Achievement, LedgerError, Metadata, StreakState};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::ledger_store::LedgerStore;

/// Base points for any daily claim.
const BASE_POINTS: i64 = 10;
/// Streak bonus ceiling.
const MAX_STREAK_BONUS: i64 = 30;

/// Bonus for a claim, given the streak length before the claim.
pub fn streak_bonus(prior_streak_days: u32) -> i64 {
    (i64::from(prior_streak_days) * 5).min(MAX_STREAK_BONUS)
}

/// Result of a successful daily claim.
#[derive(Debug, Clone)]
pub struct DailyClaim {
    pub points_earned: i64,
    pub streak_bonus: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub is_new_record: bool,
    pub new_total: i64,
    pub new_tier: u8,
    pub unlocked: Vec<Achievement>,
}

/// Tracks daily activity and claims the login bonus.
pub struct DailyStreakTracker {
    db: Arc<Database>,
    engine: Arc<AwardEngine>,
}

impl DailyStreakTracker {
    pub fn new(db: Arc<Database>, engine: Arc<AwardEngine>) -> Self {
        Self { db, engine }
    }

    /// Claim today's daily bonus. A second claim on the same date returns
    /// `AlreadyClaimedToday` with no side effects.
    pub fn claim_daily_bonus(
        &self,
        identity: &dyn IdentityProvider,
    ) -> Result<DailyClaim, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        self.claim_on(user, Utc::now().date_naive())
    }

    /// Claim the bonus for a specific calendar date. Exposed so hosts can
    /// evaluate claims against a clock they control; production callers use
    /// [`claim_daily_bonus`](Self::claim_daily_bonus).
    pub fn claim_on(&self, user: Uuid, today: NaiveDate) -> Result<DailyClaim, LedgerError> {
        let conn = self.db.connection();
        let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;

        let store = LedgerStore::new(&tx);

        if store.daily_activity_on(user, today)?.is_some() {
            return Err(LedgerError::AlreadyClaimedToday);
        }

        let yesterday = today - chrono::Duration::days(1);
        let prior = store.streak_state(user)?;

        // Continuity: yesterday's record continues the streak; any gap
        // resets to 1 regardless of how long the streak was.
        let current_streak = if store.daily_activity_on(user, yesterday)?.is_some() {
            prior.current_streak + 1
        } else {
            1
        };
        let longest_streak = prior.longest_streak.max(current_streak);

        // Previous days count for the bonus.
        let bonus = streak_bonus(current_streak - 1);
        let points_earned = BASE_POINTS + bonus;

        let mut activities = Metadata::new();
        activities.insert("daily_login".to_string(), json!(true));
        activities.insert("login_time".to_string(), json!(Utc::now().to_rfc3339()));

        // Race guard: a concurrent claim that slipped past the lookup
        // above still fails here on the (user, date) key.
        match store.insert_daily_activity(user, today, &activities, points_earned, bonus) {
            Ok(()) => {}
            Err(DatabaseError::Conflict(_)) => return Err(LedgerError::AlreadyClaimedToday),
            Err(e) => return Err(e.into()),
        }

        store.update_streak(user, current_streak, longest_streak, today)?;

        let mut metadata = Metadata::new();
        metadata.insert("streak".to_string(), json!(current_streak));
        metadata.insert("streak_bonus".to_string(), json!(bonus));
        metadata.insert("base_points".to_string(), json!(BASE_POINTS));

        let request = AwardRequest {
            action_type: ActionType::DailyLogin,
            points_amount: points_earned,
            source_id: None,
            source_type: Some("daily_login".to_string()),
            metadata,
        };

        let (new_total, new_tier, tier_changed) = self.engine.award_in_tx(&tx, user, &request)?;
        tx.commit().map_err(DatabaseError::Sqlite)?;

        let unlocked = self
            .engine
            .settle(user, &request, new_total, new_tier, tier_changed);

        Ok(DailyClaim {
            points_earned,
            streak_bonus: bonus,
            current_streak,
            longest_streak,
            is_new_record: current_streak > prior.longest_streak,
            new_total,
            new_tier,
            unlocked,
        })
    }

    /// Current streak state for a user.
    pub fn streak_state(&self, identity: &dyn IdentityProvider) -> Result<StreakState, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        let store = LedgerStore::new(self.db.connection());
        Ok(store.streak_state(user)?)
    }

    /// Whether today's bonus has already been claimed.
    pub fn today_completed(&self, identity: &dyn IdentityProvider) -> Result<bool, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        let store = LedgerStore::new(self.db.connection());
        Ok(store
            .daily_activity_on(user, Utc::now().date_naive())?
            .is_some())
    }

    /// Whether the daily bonus can be claimed right now.
    pub fn can_claim(&self, identity: &dyn IdentityProvider) -> Result<bool, LedgerError> {
        Ok(!self.today_completed(identity)?)
    }

    /// Streak status message for display.
    pub fn streak_message(&self, identity: &dyn IdentityProvider) -> Result<String, LedgerError> {
        let state = self.streak_state(identity)?;
        if self.today_completed(identity)? {
            return Ok(format!(
                "{} day streak! Come back tomorrow to continue.",
                state.current_streak
            ));
        }
        if state.current_streak > 0 {
            return Ok(format!(
                "{} day streak. Log in to continue!",
                state.current_streak
            ));
        }
        Ok("Log in every day to earn bonus Light.".to_string())
    }
}
