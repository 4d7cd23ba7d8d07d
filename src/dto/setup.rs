use serde::Deserialize;
use validator::Validate;

use crate::{
    config::AppConfig,
    dto::validation::validate_unique_ids,
    state::game::{AllocationPolicy, CategoryId, GameSettings, TeamId},
};

/// Selection made on the setup screen before a game starts.
///
/// The menu offers [`crate::config::ROUND_DURATION_CHOICES`] and
/// [`crate::config::PHRASES_PER_TEAM_CHOICES`]; other values within the
/// bounds below are accepted for custom games.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct GameSetup {
    #[validate(
        length(min = 1, message = "select at least one category"),
        custom(function = "validate_unique_ids")
    )]
    pub category_ids: Vec<CategoryId>,
    /// Teams in turn order.
    #[validate(
        length(min = 2, message = "select at least two teams"),
        custom(function = "validate_unique_ids")
    )]
    pub team_ids: Vec<TeamId>,
    #[validate(range(min = 1, max = 100))]
    pub phrases_per_team: u32,
    #[validate(range(min = 1, max = 600))]
    pub round_duration_secs: u32,
    #[serde(default)]
    pub policy: AllocationPolicy,
}

impl GameSetup {
    /// Selection using the counts and policy preselected by `config`.
    pub fn from_config(
        config: &AppConfig,
        category_ids: Vec<CategoryId>,
        team_ids: Vec<TeamId>,
    ) -> Self {
        Self {
            category_ids,
            team_ids,
            phrases_per_team: config.phrases_per_team,
            round_duration_secs: config.round_duration_secs,
            policy: config.policy,
        }
    }

    /// Settings of the game created from this selection.
    pub fn settings(&self) -> GameSettings {
        GameSettings {
            category_ids: self.category_ids.clone(),
            phrases_per_team: self.phrases_per_team,
            round_duration_secs: self.round_duration_secs,
            policy: self.policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> GameSetup {
        GameSetup::from_config(&AppConfig::default(), vec![1, 2], vec![10, 20])
    }

    #[test]
    fn default_selection_is_valid() {
        let setup = setup();
        assert!(setup.validate().is_ok());
        assert_eq!(setup.round_duration_secs, 45);
        assert_eq!(setup.phrases_per_team, 15);
    }

    #[test]
    fn categories_are_required() {
        let setup = GameSetup {
            category_ids: Vec::new(),
            ..setup()
        };
        let errors = setup.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("category_ids"));
    }

    #[test]
    fn two_distinct_teams_are_required() {
        let single = GameSetup {
            team_ids: vec![10],
            ..setup()
        };
        assert!(single.validate().is_err());

        let repeated = GameSetup {
            team_ids: vec![10, 10],
            ..setup()
        };
        let errors = repeated.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("team_ids"));
    }

    #[test]
    fn counts_are_bounded() {
        let setup = GameSetup {
            phrases_per_team: 0,
            round_duration_secs: 601,
            ..setup()
        };
        let errors = setup.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("phrases_per_team"));
        assert!(fields.contains_key("round_duration_secs"));
    }

    #[test]
    fn policy_defaults_to_shared_pool_when_omitted() {
        let setup: GameSetup = serde_json::from_str(
            r#"{"category_ids":[1],"team_ids":[1,2],"phrases_per_team":10,"round_duration_secs":30}"#,
        )
        .unwrap();
        assert_eq!(setup.policy, AllocationPolicy::SharedPool);
    }
}
