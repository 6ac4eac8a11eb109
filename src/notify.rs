//! Notification seam.
//!
//! The award engine reports human-readable outcomes (Light earned,
//! achievements unlocked) through a [`Notifier`]. Delivery is
//! fire-and-forget: a notifier can do nothing, log, or hand the notice to
//! a UI layer, but it can never fail an award.

use uuid::Uuid;

/// Outcome of one award, ready for display.
#[derive(Debug, Clone)]
pub struct AwardNotice {
    pub user_id: Uuid,
    /// Human-readable action title, e.g. "Daily Login".
    pub action_title: &'static str,
    /// Signed points amount; negative for penalties.
    pub points: i64,
    pub new_total: i64,
    pub new_tier: u8,
    pub tier_changed: bool,
    /// Names and rewards of achievements unlocked by this award.
    pub unlocked: Vec<(String, i64)>,
}

/// Receives award outcomes for display.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &AwardNotice);
}

/// Discards all notices.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notice: &AwardNotice) {}
}

/// Logs notices through `tracing`.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: &AwardNotice) {
        if notice.points >= 0 {
            tracing::info!(
                user = %notice.user_id,
                points = notice.points,
                total = notice.new_total,
                tier = notice.new_tier,
                "Light earned: +{} for {}",
                notice.points,
                notice.action_title
            );
        } else {
            tracing::info!(
                user = %notice.user_id,
                points = notice.points,
                total = notice.new_total,
                tier = notice.new_tier,
                "Light deducted: {} for {}",
                notice.points,
                notice.action_title
            );
        }

        for (name, reward) in &notice.unlocked {
            tracing::info!(user = %notice.user_id, "Achievement unlocked: {} (+{} Light)", name, reward);
        }
    }
}
