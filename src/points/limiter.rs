//! Per-action daily caps for community actions.
//!
//! The caller picks the action; the catalog determines the payout. The cap
//! check and the counter increment are one guarded SQL statement, so
//! overlapping requests can never push a counter past its cap. Caps roll
//! over at UTC midnight.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::points::catalog::{counted_action, ActionSpec};
use crate::points::engine::{AwardEngine, AwardRequest};
use crate::points::types::{ActionType, Achievement, LedgerError, Metadata};
use crate::storage::database::{Database, DatabaseError};
use crate::storage::ledger_store::LedgerStore;

/// What a community action touched, recorded in the transaction metadata.
#[derive(Debug, Clone, Default)]
pub struct ActionTarget {
    pub target_user_id: Option<Uuid>,
    pub target_content_id: Option<String>,
}

impl ActionTarget {
    pub fn user(user_id: Uuid) -> Self {
        Self {
            target_user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn content(content_id: impl Into<String>) -> Self {
        Self {
            target_content_id: Some(content_id.into()),
            ..Self::default()
        }
    }
}

/// Result of a successful community action.
#[derive(Debug, Clone)]
pub struct CommunityActionOutcome {
    pub points_earned: i64,
    pub daily_count: u32,
    pub remaining_today: u32,
    pub new_total: i64,
    pub new_tier: u8,
    pub unlocked: Vec<Achievement>,
}

/// Enforces daily caps on counted community actions.
pub struct CommunityActionLimiter {
    db: Arc<Database>,
    engine: Arc<AwardEngine>,
}

impl CommunityActionLimiter {
    pub fn new(db: Arc<Database>, engine: Arc<AwardEngine>) -> Self {
        Self { db, engine }
    }

    /// Perform a counted community action for today.
    pub fn perform(
        &self,
        identity: &dyn IdentityProvider,
        action_type: ActionType,
        target: ActionTarget,
        mut metadata: Metadata,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;

        // Validation happens before any store access.
        let spec = counted_action(action_type)
            .ok_or_else(|| LedgerError::InvalidAction(action_type.as_str().to_string()))?;

        self.perform_on(user, spec, target, &mut metadata, Utc::now().date_naive())
    }

    fn perform_on(
        &self,
        user: Uuid,
        spec: &ActionSpec,
        target: ActionTarget,
        metadata: &mut Metadata,
        today: NaiveDate,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let conn = self.db.connection();
        let tx = conn.unchecked_transaction().map_err(DatabaseError::Sqlite)?;

        let store = LedgerStore::new(&tx);
        let daily_count = match store.increment_community_action(
            user,
            spec.action_type,
            today,
            spec.max_daily,
            spec.light_per_action,
        )? {
            Some(count) => count,
            None => {
                // Nothing mutated; the guard refused the increment.
                return Err(LedgerError::CapReached {
                    action: spec.action_type,
                    max_daily: spec.max_daily,
                });
            }
        };

        if let Some(target_user) = target.target_user_id {
            metadata.insert("target_user_id".to_string(), json!(target_user.to_string()));
        }
        metadata.insert("daily_count".to_string(), json!(daily_count));

        let request = AwardRequest {
            action_type: spec.action_type,
            points_amount: spec.light_per_action,
            source_id: target.target_content_id.clone(),
            source_type: Some("community_action".to_string()),
            metadata: metadata.clone(),
        };

        let (new_total, new_tier, tier_changed) = self.engine.award_in_tx(&tx, user, &request)?;
        tx.commit().map_err(DatabaseError::Sqlite)?;

        let unlocked = self
            .engine
            .settle(user, &request, new_total, new_tier, tier_changed);

        Ok(CommunityActionOutcome {
            points_earned: spec.light_per_action,
            daily_count,
            remaining_today: spec.max_daily - daily_count,
            new_total,
            new_tier,
            unlocked,
        })
    }

    /// Send support to a member in a symptom flare.
    pub fn support_member(
        &self,
        identity: &dyn IdentityProvider,
        target_user: Uuid,
        support_type: &str,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let mut metadata = Metadata::new();
        metadata.insert("support_type".to_string(), json!(support_type));
        self.perform(
            identity,
            ActionType::SupportMember,
            ActionTarget::user(target_user),
            metadata,
        )
    }

    /// React to a post in the vent channel.
    pub fn react_to_vent(
        &self,
        identity: &dyn IdentityProvider,
        post_id: &str,
        reaction_type: &str,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let mut metadata = Metadata::new();
        metadata.insert("reaction_type".to_string(), json!(reaction_type));
        self.perform(
            identity,
            ActionType::VentReaction,
            ActionTarget::content(post_id),
            metadata,
        )
    }

    /// Welcome a newly joined member.
    pub fn welcome_member(
        &self,
        identity: &dyn IdentityProvider,
        new_user: Uuid,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let mut metadata = Metadata::new();
        metadata.insert("welcome_type".to_string(), json!("new_member"));
        self.perform(
            identity,
            ActionType::WelcomeMember,
            ActionTarget::user(new_user),
            metadata,
        )
    }

    /// Upvote a helpful research link.
    pub fn upvote_research(
        &self,
        identity: &dyn IdentityProvider,
        research_id: &str,
    ) -> Result<CommunityActionOutcome, LedgerError> {
        let mut metadata = Metadata::new();
        metadata.insert("vote_type".to_string(), json!("upvote"));
        self.perform(
            identity,
            ActionType::ResearchUpvote,
            ActionTarget::content(research_id),
            metadata,
        )
    }

    /// Remaining uses of an action today; the full cap for an action the
    /// user has not performed yet.
    pub fn remaining_today(
        &self,
        identity: &dyn IdentityProvider,
        action_type: ActionType,
    ) -> Result<u32, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;
        let spec = counted_action(action_type)
            .ok_or_else(|| LedgerError::InvalidAction(action_type.as_str().to_string()))?;

        let store = LedgerStore::new(self.db.connection());
        let used = store.community_count(user, action_type, Utc::now().date_naive())?;
        Ok(spec.max_daily.saturating_sub(used))
    }
}
