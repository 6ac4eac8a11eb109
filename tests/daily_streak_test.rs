//! Daily bonus claims: idempotency, streak continuity, and bonus math.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use lightledger::{AwardEngine, DailyStreakTracker, Database, LedgerError};

fn tracker() -> (DailyStreakTracker, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = Arc::new(AwardEngine::without_notifications(db.clone()));
    (DailyStreakTracker::new(db.clone(), engine), db)
}

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, n).unwrap()
}

#[test]
fn test_second_claim_same_day_is_rejected_without_side_effects() {
    let (tracker, db) = tracker();
    let user = Uuid::new_v4();

    let first = tracker.claim_on(user, day(1)).unwrap();
    assert_eq!(first.points_earned, 10);
    assert_eq!(first.current_streak, 1);

    let second = tracker.claim_on(user, day(1));
    assert!(matches!(second, Err(LedgerError::AlreadyClaimedToday)));

    // The rejected claim left no transaction and no total change
    let store = lightledger::storage::ledger_store::LedgerStore::new(db.connection());
    assert_eq!(store.transaction_count(user).unwrap(), 1);
    assert_eq!(store.tier_state(user).unwrap().unwrap().total_light, 10);
}

#[test]
fn test_consecutive_days_grow_streak_and_bonus() {
    let (tracker, _db) = tracker();
    let user = Uuid::new_v4();

    // Bonus is keyed off the streak before the claim: day one pays base
    // only, day two pays 10 + 5, day three pays 10 + 10.
    let c1 = tracker.claim_on(user, day(1)).unwrap();
    assert_eq!((c1.current_streak, c1.points_earned), (1, 10));

    let c2 = tracker.claim_on(user, day(2)).unwrap();
    assert_eq!((c2.current_streak, c2.points_earned), (2, 15));

    let c3 = tracker.claim_on(user, day(3)).unwrap();
    assert_eq!((c3.current_streak, c3.points_earned), (3, 20));
    assert_eq!(c3.streak_bonus, 10);
    assert_eq!(c3.longest_streak, 3);

    // A user at streak 3 claims 10 + 15 and becomes streak 4
    let c4 = tracker.claim_on(user, day(4)).unwrap();
    assert_eq!((c4.current_streak, c4.points_earned), (4, 25));
}

#[test]
fn test_missed_day_resets_streak_but_keeps_longest() {
    let (tracker, _db) = tracker();
    let user = Uuid::new_v4();

    tracker.claim_on(user, day(1)).unwrap();
    tracker.claim_on(user, day(2)).unwrap();
    tracker.claim_on(user, day(3)).unwrap();

    // Skip day 4 entirely
    let after_gap = tracker.claim_on(user, day(5)).unwrap();
    assert_eq!(after_gap.current_streak, 1);
    assert_eq!(after_gap.longest_streak, 3);
    assert_eq!(after_gap.streak_bonus, 0);
    assert_eq!(after_gap.points_earned, 10);
    assert!(!after_gap.is_new_record);
}

#[test]
fn test_bonus_tops_out_after_six_prior_days() {
    let (tracker, _db) = tracker();
    let user = Uuid::new_v4();

    let mut last = None;
    for n in 1..=10 {
        last = Some(tracker.claim_on(user, day(n)).unwrap());
    }

    let claim = last.unwrap();
    assert_eq!(claim.current_streak, 10);
    assert_eq!(claim.streak_bonus, 30);
    assert_eq!(claim.points_earned, 40);
}
