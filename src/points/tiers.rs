//! Tier resolution from lifetime Light totals.
//!
//! A pure function over a fixed ascending threshold table. Tier never
//! decreases as the total increases; over a user's lifetime it only moves
//! down where an explicit penalty lowers the total.

/// (tier, lifetime-total threshold, title), ascending.
pub const TIER_THRESHOLDS: [(u8, i64, &str); 7] = [
    (1, 0, "The Spark"),
    (2, 250, "The Lamplighter"),
    (3, 1000, "The Beacon"),
    (4, 3000, "The Sentinel"),
    (5, 7000, "The Guardian"),
    (6, 15000, "The Luminary"),
    (7, 30000, "The Citadel Heart"),
];

/// Highest tier whose threshold is at or below the total.
pub fn tier_for_total(total: i64) -> u8 {
    TIER_THRESHOLDS
        .iter()
        .rev()
        .find(|(_, threshold, _)| total >= *threshold)
        .map(|(tier, _, _)| *tier)
        .unwrap_or(1)
}

/// Display title for a tier.
pub fn tier_title(tier: u8) -> &'static str {
    TIER_THRESHOLDS
        .iter()
        .find(|(t, _, _)| *t == tier)
        .map(|(_, _, title)| *title)
        .unwrap_or("The Spark")
}

/// The next tier above the given one and its threshold; None at the top.
pub fn next_tier_threshold(tier: u8) -> Option<(u8, i64)> {
    TIER_THRESHOLDS
        .iter()
        .find(|(t, _, _)| *t == tier + 1)
        .map(|(t, threshold, _)| (*t, *threshold))
}
