//! Static catalog of capped community actions.
//!
//! Read-only at runtime: changing a cap or payout is a code change and a
//! deploy, not a database write. Only the four counted community actions
//! live here; dynamically valued actions (daily login, photo captures,
//! knowledge sharing, alliances, achievement rewards) carry their own
//! reward rules in their modules.

use crate::points::types::ActionType;

/// Cap and payout for one counted community action.
#[derive(Debug, Clone, Copy)]
pub struct ActionSpec {
    pub action_type: ActionType,
    pub max_daily: u32,
    pub light_per_action: i64,
    pub description: &'static str,
}

/// The counted community actions and their daily caps.
pub const COMMUNITY_ACTIONS: [ActionSpec; 4] = [
    ActionSpec {
        action_type: ActionType::SupportMember,
        max_daily: 5,
        light_per_action: 10,
        description: "Send support to members in symptom flare",
    },
    ActionSpec {
        action_type: ActionType::VentReaction,
        max_daily: 10,
        light_per_action: 5,
        description: "React to posts in the vent channel",
    },
    ActionSpec {
        action_type: ActionType::WelcomeMember,
        max_daily: 3,
        light_per_action: 25,
        description: "Welcome new members (first 3 welcomes)",
    },
    ActionSpec {
        action_type: ActionType::ResearchUpvote,
        max_daily: 10,
        light_per_action: 5,
        description: "Upvote helpful research links",
    },
];

/// Look up the spec for a counted action; None for any action the limiter
/// does not govern.
pub fn counted_action(action_type: ActionType) -> Option<&'static ActionSpec> {
    COMMUNITY_ACTIONS
        .iter()
        .find(|spec| spec.action_type == action_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counted_action_caps() {
        let support = counted_action(ActionType::SupportMember).unwrap();
        assert_eq!(support.max_daily, 5);
        assert_eq!(support.light_per_action, 10);

        let welcome = counted_action(ActionType::WelcomeMember).unwrap();
        assert_eq!(welcome.max_daily, 3);
        assert_eq!(welcome.light_per_action, 25);

        let vent = counted_action(ActionType::VentReaction).unwrap();
        assert_eq!(vent.max_daily, 10);
        assert_eq!(vent.light_per_action, 5);
    }

    #[test]
    fn test_dynamic_actions_are_not_counted() {
        assert!(counted_action(ActionType::DailyLogin).is_none());
        assert!(counted_action(ActionType::KnowledgeShare).is_none());
        assert!(counted_action(ActionType::PhotoCapture).is_none());
        assert!(counted_action(ActionType::AchievementUnlock).is_none());
    }
}
