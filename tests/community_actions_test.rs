//! Community action caps: each counted action has its own daily ceiling.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use lightledger::points::types::ActionType;
use lightledger::{
    AwardEngine, CommunityActionLimiter, Database, IdentityProvider, LedgerError, StaticIdentity,
};

fn limiter() -> (CommunityActionLimiter, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let engine = Arc::new(AwardEngine::without_notifications(db.clone()));
    (CommunityActionLimiter::new(db.clone(), engine), db)
}

#[test]
fn test_support_cap_admits_five_then_refuses() {
    let (limiter, db) = limiter();
    let identity = StaticIdentity::signed_in(Uuid::new_v4());

    for n in 1..=5u32 {
        let outcome = limiter
            .support_member(&identity, Uuid::new_v4(), "hug")
            .unwrap();
        assert_eq!(outcome.points_earned, 10);
        assert_eq!(outcome.daily_count, n);
        assert_eq!(outcome.remaining_today, 5 - n);
    }

    let sixth = limiter.support_member(&identity, Uuid::new_v4(), "hug");
    assert!(matches!(
        sixth,
        Err(LedgerError::CapReached {
            action: ActionType::SupportMember,
            max_daily: 5
        })
    ));

    // The refused attempt wrote nothing
    let store = lightledger::storage::LedgerStore::new(db.connection());
    let user = identity.authenticated_user().unwrap();
    assert_eq!(store.transaction_count(user).unwrap(), 5);
    assert_eq!(store.tier_state(user).unwrap().unwrap().total_light, 50);
}

#[test]
fn test_caps_are_per_action_type() {
    let (limiter, _db) = limiter();
    let identity = StaticIdentity::signed_in(Uuid::new_v4());

    for _ in 0..5 {
        limiter
            .support_member(&identity, Uuid::new_v4(), "hug")
            .unwrap();
    }

    // Support is exhausted; vent reactions still have their own budget
    let outcome = limiter.react_to_vent(&identity, "post-1", "heart").unwrap();
    assert_eq!(outcome.points_earned, 5);
    assert_eq!(outcome.daily_count, 1);
    assert_eq!(outcome.remaining_today, 9);
}

#[test]
fn test_welcome_cap_of_three() {
    let (limiter, _db) = limiter();
    let identity = StaticIdentity::signed_in(Uuid::new_v4());

    for _ in 0..3 {
        let outcome = limiter.welcome_member(&identity, Uuid::new_v4()).unwrap();
        assert_eq!(outcome.points_earned, 25);
    }

    assert!(matches!(
        limiter.welcome_member(&identity, Uuid::new_v4()),
        Err(LedgerError::CapReached { max_daily: 3, .. })
    ));
}

#[test]
fn test_uncounted_action_is_invalid_for_the_limiter() {
    let (limiter, _db) = limiter();
    let identity = StaticIdentity::signed_in(Uuid::new_v4());

    let result = limiter.perform(
        &identity,
        ActionType::KnowledgeShare,
        Default::default(),
        Default::default(),
    );
    assert!(matches!(result, Err(LedgerError::InvalidAction(_))));
}

#[test]
fn test_anonymous_caller_rejected() {
    let (limiter, _db) = limiter();

    let result = limiter.support_member(&StaticIdentity::anonymous(), Uuid::new_v4(), "hug");
    assert!(matches!(result, Err(LedgerError::Unauthenticated)));
}

#[test]
fn test_concurrent_attempts_across_connections_admit_exactly_the_cap() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_path_buf();

    // First open runs the migration; the per-thread connections reopen the
    // same file.
    drop(Database::open(&path).unwrap());

    let user = Uuid::new_v4();
    let threads = 8;
    let attempts_per_thread = 2;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let path = path.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                let db = Database::open(&path).unwrap();
                db.connection()
                    .busy_timeout(Duration::from_secs(5))
                    .unwrap();
                let db = Arc::new(db);
                let engine = Arc::new(AwardEngine::without_notifications(db.clone()));
                let limiter = CommunityActionLimiter::new(db, engine);
                let identity = StaticIdentity::signed_in(user);

                barrier.wait();
                let mut accepted = 0u32;
                let mut refused = 0u32;
                for _ in 0..attempts_per_thread {
                    match limiter.support_member(&identity, Uuid::new_v4(), "hug") {
                        Ok(_) => accepted += 1,
                        Err(LedgerError::CapReached { .. }) => refused += 1,
                        Err(e) => panic!("unexpected error under contention: {e}"),
                    }
                }
                (accepted, refused)
            })
        })
        .collect();

    let mut accepted = 0;
    let mut refused = 0;
    for handle in handles {
        let (a, r) = handle.join().unwrap();
        accepted += a;
        refused += r;
    }

    // Of 16 racing attempts past cap 5, exactly 5 land
    assert_eq!(accepted, 5);
    assert_eq!(refused, 11);

    let db = Database::open(&path).unwrap();
    let store = lightledger::storage::LedgerStore::new(db.connection());
    assert_eq!(
        store
            .community_count(user, ActionType::SupportMember, Utc::now().date_naive())
            .unwrap(),
        5
    );
    assert_eq!(store.transaction_count(user).unwrap(), 5);
    assert_eq!(store.tier_state(user).unwrap().unwrap().total_light, 50);
}

#[test]
fn test_remaining_today_tracks_usage() {
    let (limiter, _db) = limiter();
    let identity = StaticIdentity::signed_in(Uuid::new_v4());

    assert_eq!(
        limiter
            .remaining_today(&identity, ActionType::ResearchUpvote)
            .unwrap(),
        10
    );

    limiter.upvote_research(&identity, "paper-1").unwrap();
    limiter.upvote_research(&identity, "paper-2").unwrap();

    assert_eq!(
        limiter
            .remaining_today(&identity, ActionType::ResearchUpvote)
            .unwrap(),
        8
    );
}
