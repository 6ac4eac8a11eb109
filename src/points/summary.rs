//! Read-model for the points dashboard.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::IdentityProvider;
use crate::points::tiers::{next_tier_threshold, tier_title};
use crate::points::types::{LedgerError, PointsTransaction, StreakState};
use crate::storage::database::Database;
use crate::storage::ledger_store::LedgerStore;

/// Everything the points screen shows in one read.
#[derive(Debug, Clone)]
pub struct PointsSummary {
    pub total_light: i64,
    pub current_tier: u8,
    pub tier_title: &'static str,
    /// Net Light moved today, penalties included.
    pub light_today: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Next tier and the Light still needed to reach it; None at the top.
    pub next_tier: Option<NextTier>,
    pub recent_transactions: Vec<PointsTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTier {
    pub tier: u8,
    pub threshold: i64,
    pub light_needed: i64,
}

/// Assembles the dashboard summary from the aggregate tables and the
/// recent ledger tail. Reads only.
pub struct SummaryReader {
    db: Arc<Database>,
}

impl SummaryReader {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn summary(
        &self,
        identity: &dyn IdentityProvider,
        recent_limit: u32,
    ) -> Result<PointsSummary, LedgerError> {
        let user = identity
            .authenticated_user()
            .ok_or(LedgerError::Unauthenticated)?;

        let store = LedgerStore::new(self.db.connection());

        let tier_state = store.tier_state(user)?;
        let (total_light, current_tier) = tier_state
            .map(|s| (s.total_light, s.current_tier))
            .unwrap_or((0, 1));

        let StreakState {
            current_streak,
            longest_streak,
            ..
        } = store.streak_state(user)?;

        let next_tier = next_tier_threshold(current_tier).map(|(tier, threshold)| NextTier {
            tier,
            threshold,
            light_needed: (threshold - total_light).max(0),
        });

        Ok(PointsSummary {
            total_light,
            current_tier,
            tier_title: tier_title(current_tier),
            light_today: store.light_earned_on(user, Utc::now().date_naive())?,
            current_streak,
            longest_streak,
            next_tier,
            recent_transactions: store.recent_transactions(user, recent_limit)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticIdentity;
    use crate::points::engine::{AwardEngine, AwardRequest};
    use crate::points::types::ActionType;
    use uuid::Uuid;

    #[test]
    fn test_summary_for_a_fresh_user_is_zeroed() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let reader = SummaryReader::new(db);
        let identity = StaticIdentity::signed_in(Uuid::new_v4());

        let summary = reader.summary(&identity, 10).unwrap();
        assert_eq!(summary.total_light, 0);
        assert_eq!(summary.current_tier, 1);
        assert_eq!(summary.tier_title, "The Spark");
        assert_eq!(summary.light_today, 0);
        assert_eq!(
            summary.next_tier,
            Some(NextTier {
                tier: 2,
                threshold: 250,
                light_needed: 250
            })
        );
        assert!(summary.recent_transactions.is_empty());
    }

    #[test]
    fn test_summary_reflects_awards_and_next_tier_gap() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let engine = AwardEngine::without_notifications(db.clone());
        let identity = StaticIdentity::signed_in(Uuid::new_v4());

        engine
            .award(&identity, AwardRequest::new(ActionType::KnowledgeShare, 150))
            .unwrap();

        let reader = SummaryReader::new(db);
        let summary = reader.summary(&identity, 10).unwrap();
        assert_eq!(summary.total_light, 150);
        assert_eq!(summary.light_today, 150);
        assert_eq!(summary.next_tier.unwrap().light_needed, 100);
        assert_eq!(summary.recent_transactions.len(), 1);
    }
}
