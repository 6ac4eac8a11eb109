//! Small driver that exercises the ledger end to end against a local
//! database: claim the daily bonus, perform a community action, and print
//! the resulting summary.

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lightledger::points::summary::SummaryReader;
use lightledger::{
    AwardEngine, ChallengeTracker, CommunityActionLimiter, DailyStreakTracker, Database,
    LedgerError, LogNotifier, StaticIdentity,
};

fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("LIGHTLEDGER_DB") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "lightledger", "lightledger")
        .map(|dirs| dirs.data_dir().join("ledger.db"))
        .unwrap_or_else(|| PathBuf::from("ledger.db"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    tracing::info!("Opening ledger database at {}", path.display());

    let db = Arc::new(Database::open(&path)?);
    let engine = Arc::new(AwardEngine::new(db.clone(), Arc::new(LogNotifier)));
    engine.seed_default_achievements()?;

    let streaks = DailyStreakTracker::new(db.clone(), engine.clone());
    let limiter = CommunityActionLimiter::new(db.clone(), engine.clone());
    let challenges = ChallengeTracker::new(db.clone(), engine.clone());

    // Stable demo user so repeated runs exercise the daily guards.
    let user = Uuid::parse_str("00000000-0000-0000-0000-000000000001")?;
    let identity = StaticIdentity::signed_in(user);

    match streaks.claim_daily_bonus(&identity) {
        Ok(claim) => println!(
            "Daily bonus: +{} Light (streak {}, bonus {})",
            claim.points_earned, claim.current_streak, claim.streak_bonus
        ),
        Err(LedgerError::AlreadyClaimedToday) => {
            println!("Daily bonus already claimed today.")
        }
        Err(e) => return Err(e.into()),
    }

    match limiter.support_member(&identity, Uuid::new_v4(), "hug") {
        Ok(outcome) => println!(
            "Sent support: +{} Light ({} left today)",
            outcome.points_earned, outcome.remaining_today
        ),
        Err(LedgerError::CapReached { action, max_daily }) => {
            println!(
                "Support cap reached: {} is limited to {} per day.",
                action.title(),
                max_daily
            )
        }
        Err(e) => return Err(e.into()),
    }

    match challenges.record_photo(&identity, "demo-challenge", "garden") {
        Ok(reward) => println!(
            "Photo recorded: +{} Light (day {}, streak {})",
            reward.points_earned, reward.total_photos, reward.current_streak
        ),
        Err(LedgerError::AlreadyClaimedToday) => {
            println!("Today's challenge photo is already in.")
        }
        Err(e) => return Err(e.into()),
    }

    let summary = SummaryReader::new(db).summary(&identity, 5)?;
    println!(
        "\n{} - tier {} ({}) with {} Light ({} today)",
        user, summary.current_tier, summary.tier_title, summary.total_light, summary.light_today
    );
    if let Some(next) = summary.next_tier {
        println!("{} Light to tier {}", next.light_needed, next.tier);
    }
    for tx in &summary.recent_transactions {
        println!(
            "  {:>5}  {}  {}",
            tx.points_amount,
            tx.created_at.format("%Y-%m-%d %H:%M"),
            tx.action_type.title()
        );
    }

    Ok(())
}
