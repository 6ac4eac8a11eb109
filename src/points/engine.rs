//! Award engine: the single funnel for every point movement.
//!
//! Each award appends a ledger transaction, bumps the lifetime total, and
//! recomputes the tier inside one SQL transaction. Achievement evaluation
//! runs after commit and is best-effort: a failure there is logged and
//! never rolls back the award itself.

use std::sync::Arc;

use rusqlite::Connection;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::notify::{AwardNotice, Notifier, NullNotifier};
use crate::points::achievements;
use crate::points::tiers::tier_for_total;
use crate::points::types::{ActionType, Achievement, LedgerError, Metadata};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::ledger_store::LedgerStore;

/// One award request.
#[derive(Debug, Clone)]
pub struct AwardRequest {
    pub action_type: ActionType,
    /// Signed; negative for penalties.
    pub points_amount: i64,
    pub source_id: Option<String>,
    pub source_type: Option<String>,
    pub metadata: Metadata,
}

impl AwardRequest {
    pub fn new(action_type: ActionType, points_amount: i64) -> Self {
        Self {
            action_type,
            points_amount,
            source_id: None,
            source_type: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>, source_type: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self.source_type = Some(source_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of a settled award.
#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub new_total: i64,
    pub new_tier: u8,
    pub tier_changed: bool,
    pub unlocked: Vec<Achievement>,
}

/// The award engine.
pub struct AwardEngine {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
}

impl AwardEngine {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Engine with notifications discarded.
    pub fn without_notifications(db: Arc<Database>) -> Self {
        Self::new(db, Arc::new(NullNotifier))
    }

    /// Award points for an action. Rejects anonymous callers before any
    /// store access.
    pub fn award(
        &self,
        identity: &dyn IdentityProvider,
        request: AwardRequest,
    ) -> Result<AwardOutcome, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        self.award_to(user, request)
    }

    /// Award to a resolved user. Crate-internal paths (limiter, streak,
    /// achievement rewards) enter here after their own identity check.
    pub(crate) fn award_to(
        &self,
        user: Uuid,
        request: AwardRequest,
    ) -> Result<AwardOutcome, LedgerError> {
        let conn = self.db.connection();
        let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;
        let (new_total, new_tier, tier_changed) = self.award_in_tx(&tx, user, &request)?;
        tx.commit().map_err(DatabaseError::Sqlite)?;

        let unlocked = self.settle(user, &request, new_total, new_tier, tier_changed);

        Ok(AwardOutcome {
            new_total,
            new_tier,
            tier_changed,
            unlocked,
        })
    }

    /// Steps 1-3 of an award against a connection that is already inside a
    /// transaction: append the ledger row, bump the total, recompute and
    /// persist the tier. The caller owns commit/rollback.
    pub(crate) fn award_in_tx(
        &self,
        conn: &Connection,
        user: Uuid,
        request: &AwardRequest,
    ) -> Result<(i64, u8, bool), LedgerError> {
        let store = LedgerStore::new(conn);

        store.insert_transaction(
            user,
            request.action_type,
            request.points_amount,
            request.source_id.as_deref(),
            request.source_type.as_deref(),
            &request.metadata,
        )?;

        let new_total = store.add_to_total(user, request.points_amount)?;
        let new_tier = tier_for_total(new_total);
        let tier_changed = store.set_tier(user, new_tier)?;

        tracing::debug!(
            user = %user,
            action = request.action_type.as_str(),
            points = request.points_amount,
            total = new_total,
            tier = new_tier,
            "Recorded points transaction"
        );
        if tier_changed {
            tracing::info!(user = %user, tier = new_tier, "Tier changed");
        }

        Ok((new_total, new_tier, tier_changed))
    }

    /// Post-commit side effects: achievement evaluation (best-effort) and
    /// notification (fire-and-forget). Also used by paths that run
    /// `award_in_tx` inside their own transaction.
    pub(crate) fn settle(
        &self,
        user: Uuid,
        request: &AwardRequest,
        new_total: i64,
        new_tier: u8,
        tier_changed: bool,
    ) -> Vec<Achievement> {
        let unlocked = if request.action_type.triggers_achievements() {
            match self.check_and_unlock(user, request.action_type, &request.metadata) {
                Ok(unlocked) => unlocked,
                Err(e) => {
                    // Advisory side effect; the award itself stands.
                    tracing::warn!(user = %user, "Achievement evaluation failed: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        self.notifier.notify(&AwardNotice {
            user_id: user,
            action_title: request.action_type.title(),
            points: request.points_amount,
            new_total,
            new_tier,
            tier_changed,
            unlocked: unlocked
                .iter()
                .map(|a| (a.name.clone(), a.points_reward))
                .collect(),
        });

        unlocked
    }

    /// Evaluate every still-locked achievement against this award and
    /// unlock the matches. Each unlock grants its reward through a
    /// recursive, non-triggering award.
    fn check_and_unlock(
        &self,
        user: Uuid,
        action_type: ActionType,
        metadata: &Metadata,
    ) -> Result<Vec<Achievement>, LedgerError> {
        let candidates = {
            let store = LedgerStore::new(self.db.connection());
            store.locked_achievements(user)?
        };

        let mut unlocked = Vec::new();
        for achievement in candidates {
            if !achievements::requirement_met(&achievement, action_type, metadata) {
                continue;
            }

            let inserted = {
                let store = LedgerStore::new(self.db.connection());
                store.insert_user_achievement(user, &achievement.id)?
            };
            if !inserted {
                continue;
            }

            // The reward is itself a ledger transaction, but flagged
            // non-triggering so it cannot cascade into further unlocks.
            self.award_to(
                user,
                AwardRequest::new(ActionType::AchievementUnlock, achievement.points_reward)
                    .with_source(achievement.id.clone(), "achievement"),
            )?;

            tracing::info!(
                user = %user,
                achievement = achievement.id,
                reward = achievement.points_reward,
                "Achievement unlocked"
            );
            unlocked.push(achievement);
        }

        Ok(unlocked)
    }

    /// Seed the achievement catalog; safe to call on every startup.
    pub fn seed_default_achievements(&self) -> Result<(), LedgerError> {
        let store = LedgerStore::new(self.db.connection());
        store.seed_achievements(&achievements::default_achievements())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;

    fn engine() -> (AwardEngine, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (AwardEngine::without_notifications(db.clone()), db)
    }

    #[test]
    fn test_unauthenticated_award_rejected_before_any_write() {
        let (engine, _db) = engine();
        let result = engine.award(
            &StaticIdentity::anonymous(),
            AwardRequest::new(ActionType::KnowledgeShare, 150),
        );
        assert!(matches!(result, Err(LedgerError::Unauthenticated)));
    }

    #[test]
    fn test_award_updates_total_and_tier_together() {
        let (engine, db) = engine();
        let user = Uuid::new_v4();
        let identity = StaticIdentity::signed_in(user);

        let outcome = engine
            .award(&identity, AwardRequest::new(ActionType::KnowledgeShare, 150))
            .unwrap();
        assert_eq!(outcome.new_total, 150);
        assert_eq!(outcome.new_tier, 1);
        assert!(!outcome.tier_changed);

        let outcome = engine
            .award(&identity, AwardRequest::new(ActionType::KnowledgeShare, 150))
            .unwrap();
        assert_eq!(outcome.new_total, 300);
        assert_eq!(outcome.new_tier, 2);
        assert!(outcome.tier_changed);

        let store = LedgerStore::new(db.connection());
        let state = store.tier_state(user).unwrap().unwrap();
        assert_eq!(state.total_light, 300);
        assert_eq!(state.current_tier, 2);
    }

    #[test]
    fn test_negative_award_recomputes_tier_downward() {
        let (engine, db) = engine();
        let user = Uuid::new_v4();
        let identity = StaticIdentity::signed_in(user);

        engine
            .award(&identity, AwardRequest::new(ActionType::KnowledgeShare, 3050))
            .unwrap();

        let outcome = engine
            .award(
                &identity,
                AwardRequest::new(ActionType::EarlyTimelapsePenalty, -100),
            )
            .unwrap();
        assert_eq!(outcome.new_total, 2950);
        assert_eq!(outcome.new_tier, 3);
        assert!(outcome.tier_changed);

        // Append-only: both transactions remain
        let store = LedgerStore::new(db.connection());
        assert_eq!(store.transaction_count(user).unwrap(), 2);
    }
}
