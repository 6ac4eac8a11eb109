//! Photo-challenge earnings and the early-generation penalty.
//!
//! Tracks per-challenge progress (photo streak over consecutive days,
//! total photos, points earned from the challenge) and routes earnings
//! through the award engine. Capture, upload, and time-lapse rendering
//! live elsewhere; this module only owns the point arithmetic.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::points::engine::{AwardEngine, AwardRequest};
use crate::points::types::{
    ActionType, Achievement, ChallengeProgress, LedgerError, Metadata,
};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::ledger_store::LedgerStore;

/// Base points for any accepted photo.
const PHOTO_BASE_POINTS: i64 = 15;
/// One-time bonus for the first photo of a challenge.
const FIRST_PHOTO_BONUS: i64 = 10;
/// Photo streak bonus ceiling.
const MAX_PHOTO_STREAK_BONUS: i64 = 20;
/// Penalty for generating the time-lapse before the challenge ends.
const EARLY_PENALTY_PERCENT: i64 = 20;

/// Bonus for a photo, given the streak including today's photo.
fn photo_streak_bonus(streak_days: u32) -> i64 {
    if streak_days > 1 {
        (i64::from(streak_days) * 2).min(MAX_PHOTO_STREAK_BONUS)
    } else {
        0
    }
}

/// Result of recording a photo.
#[derive(Debug, Clone)]
pub struct PhotoReward {
    pub points_earned: i64,
    pub base_points: i64,
    pub bonus_points: i64,
    pub streak_bonus: i64,
    pub current_streak: u32,
    pub total_photos: u32,
    pub is_first_photo: bool,
    pub new_total: i64,
    pub new_tier: u8,
    pub unlocked: Vec<Achievement>,
}

/// Result of applying the early-generation penalty.
#[derive(Debug, Clone)]
pub struct PenaltyOutcome {
    /// Points deducted; zero when the challenge had nothing to deduct.
    pub points_deducted: i64,
    pub new_total: i64,
    pub new_tier: u8,
}

/// Photo-challenge progress tracking and rewards.
pub struct ChallengeTracker {
    db: Arc<Database>,
    engine: Arc<AwardEngine>,
}

impl ChallengeTracker {
    pub fn new(db: Arc<Database>, engine: Arc<AwardEngine>) -> Self {
        Self { db, engine }
    }

    /// Record today's photo for a challenge and award the earnings.
    /// A second photo on the same UTC date returns `AlreadyClaimedToday`.
    pub fn record_photo(
        &self,
        identity: &dyn IdentityProvider,
        challenge_id: &str,
        target_area: &str,
    ) -> Result<PhotoReward, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        self.record_photo_on(user, challenge_id, target_area, Utc::now().date_naive())
    }

    /// Record a photo for a specific calendar date; see
    /// [`record_photo`](Self::record_photo).
    pub fn record_photo_on(
        &self,
        user: Uuid,
        challenge_id: &str,
        target_area: &str,
        today: NaiveDate,
    ) -> Result<PhotoReward, LedgerError> {
        let conn = self.db.connection();
        let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;

        let store = LedgerStore::new(&tx);
        let prior = store
            .challenge_progress(user, challenge_id)?
            .unwrap_or_default();

        if prior.last_photo_date == Some(today) {
            return Err(LedgerError::AlreadyClaimedToday);
        }

        let yesterday = today - chrono::Duration::days(1);
        let current_streak = if prior.last_photo_date == Some(yesterday) {
            prior.current_streak + 1
        } else {
            1
        };
        let total_photos = prior.total_photos + 1;
        let is_first_photo = total_photos == 1;

        let base_points = PHOTO_BASE_POINTS;
        let bonus_points = if is_first_photo { FIRST_PHOTO_BONUS } else { 0 };
        let streak_bonus = photo_streak_bonus(current_streak);
        let points_earned = base_points + bonus_points + streak_bonus;

        let progress = ChallengeProgress {
            current_streak,
            longest_streak: prior.longest_streak.max(current_streak),
            total_photos,
            points_earned: prior.points_earned + points_earned,
            last_photo_date: Some(today),
        };
        store.upsert_challenge_progress(user, challenge_id, &progress)?;

        let mut metadata = Metadata::new();
        metadata.insert("challenge_type".to_string(), json!(target_area));
        metadata.insert("day_number".to_string(), json!(total_photos));
        metadata.insert("streak".to_string(), json!(current_streak));
        metadata.insert("is_first_photo".to_string(), json!(is_first_photo));
        metadata.insert("base_points".to_string(), json!(base_points));
        metadata.insert("bonus_points".to_string(), json!(bonus_points));
        metadata.insert("streak_bonus".to_string(), json!(streak_bonus));

        let request = AwardRequest {
            action_type: ActionType::PhotoCapture,
            points_amount: points_earned,
            source_id: Some(challenge_id.to_string()),
            source_type: Some("photo_challenge".to_string()),
            metadata,
        };

        let (new_total, new_tier, tier_changed) = self.engine.award_in_tx(&tx, user, &request)?;
        tx.commit().map_err(DatabaseError::Sqlite)?;

        let unlocked = self
            .engine
            .settle(user, &request, new_total, new_tier, tier_changed);

        Ok(PhotoReward {
            points_earned,
            base_points,
            bonus_points,
            streak_bonus,
            current_streak,
            total_photos,
            is_first_photo,
            new_total,
            new_tier,
            unlocked,
        })
    }

    /// Deduct 20% of a challenge's earned points for generating its
    /// time-lapse early. Appends one negative transaction; prior rows are
    /// never edited, and the tier is recomputed from the reduced total.
    pub fn apply_early_generation_penalty(
        &self,
        identity: &dyn IdentityProvider,
        challenge_id: &str,
    ) -> Result<PenaltyOutcome, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;

        let conn = self.db.connection();
        let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;

        let store = LedgerStore::new(&tx);
        let progress = store.challenge_progress(user, challenge_id)?;

        let earned = progress.map(|p| p.points_earned).unwrap_or(0);
        let penalty = earned * EARLY_PENALTY_PERCENT / 100;
        if penalty == 0 {
            // Nothing to deduct; report the current aggregate unchanged.
            let state = store.tier_state(user)?;
            return Ok(PenaltyOutcome {
                points_deducted: 0,
                new_total: state.as_ref().map(|s| s.total_light).unwrap_or(0),
                new_tier: state.map(|s| s.current_tier).unwrap_or(1),
            });
        }

        store.deduct_challenge_points(user, challenge_id, penalty)?;

        let mut metadata = Metadata::new();
        metadata.insert("original_points".to_string(), json!(earned));
        metadata.insert("penalty_percent".to_string(), json!(EARLY_PENALTY_PERCENT));
        metadata.insert(
            "reason".to_string(),
            json!("early_generation_penalty"),
        );

        let request = AwardRequest {
            action_type: ActionType::EarlyTimelapsePenalty,
            points_amount: -penalty,
            source_id: Some(challenge_id.to_string()),
            source_type: Some("photo_challenge".to_string()),
            metadata,
        };

        let (new_total, new_tier, tier_changed) = self.engine.award_in_tx(&tx, user, &request)?;
        tx.commit().map_err(DatabaseError::Sqlite)?;

        // Penalties are non-triggering; settle only notifies.
        self.engine
            .settle(user, &request, new_total, new_tier, tier_changed);

        tracing::info!(
            user = %user,
            challenge = challenge_id,
            penalty,
            "Applied early generation penalty"
        );

        Ok(PenaltyOutcome {
            points_deducted: penalty,
            new_total,
            new_tier,
        })
    }

    /// Progress for one challenge; zeroed defaults before the first photo.
    pub fn progress(
        &self,
        identity: &dyn IdentityProvider,
        challenge_id: &str,
    ) -> Result<ChallengeProgress, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        let store = LedgerStore::new(self.db.connection());
        Ok(store
            .challenge_progress(user, challenge_id)?
            .unwrap_or_default())
    }
}
