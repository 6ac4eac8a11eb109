//! Achievement catalog and requirement evaluation.
//!
//! Evaluation is a pure function over the triggering action and its
//! metadata; the award engine drives the unlock loop and routes rewards
//! back through itself as non-triggering awards.

use crate::points::types::{
    Achievement, AchievementCategory, ActionType, Metadata, Rarity, RequirementType,
};

/// Whether an achievement's requirement is satisfied by this award.
pub fn requirement_met(
    achievement: &Achievement,
    action_type: ActionType,
    metadata: &Metadata,
) -> bool {
    match achievement.requirement_type {
        RequirementType::LoginStreak => metadata
            .get("streak")
            .and_then(|v| v.as_i64())
            .map(|streak| streak >= achievement.requirement_value)
            .unwrap_or(false),
        RequirementType::TipsShared => action_type == ActionType::KnowledgeShare,
        RequirementType::ProfileCompletion => {
            action_type == ActionType::ProfileCompletion
                && metadata
                    .get("completion_percentage")
                    .and_then(|v| v.as_i64())
                    .map(|pct| pct >= achievement.requirement_value)
                    .unwrap_or(false)
        }
    }
}

/// Default achievement catalog, seeded on startup.
pub fn default_achievements() -> Vec<Achievement> {
    vec![
        Achievement {
            id: "ember_keeper".to_string(),
            name: "Ember Keeper".to_string(),
            description: "Log in 3 days in a row".to_string(),
            category: AchievementCategory::Consistency,
            requirement_type: RequirementType::LoginStreak,
            requirement_value: 3,
            points_reward: 50,
            rarity: Rarity::Common,
        },
        Achievement {
            id: "flame_tender".to_string(),
            name: "Flame Tender".to_string(),
            description: "Log in 7 days in a row".to_string(),
            category: AchievementCategory::Consistency,
            requirement_type: RequirementType::LoginStreak,
            requirement_value: 7,
            points_reward: 100,
            rarity: Rarity::Rare,
        },
        Achievement {
            id: "eternal_flame".to_string(),
            name: "Eternal Flame".to_string(),
            description: "Log in 30 days in a row".to_string(),
            category: AchievementCategory::Consistency,
            requirement_type: RequirementType::LoginStreak,
            requirement_value: 30,
            points_reward: 500,
            rarity: Rarity::Legendary,
        },
        Achievement {
            id: "first_light".to_string(),
            name: "First Light".to_string(),
            description: "Share your first relief strategy".to_string(),
            category: AchievementCategory::Community,
            requirement_type: RequirementType::TipsShared,
            requirement_value: 1,
            points_reward: 75,
            rarity: Rarity::Common,
        },
        Achievement {
            id: "fully_armored".to_string(),
            name: "Fully Armored".to_string(),
            description: "Complete your entire profile".to_string(),
            category: AchievementCategory::Profile,
            requirement_type: RequirementType::ProfileCompletion,
            requirement_value: 100,
            points_reward: 100,
            rarity: Rarity::Rare,
        },
    ]
}
