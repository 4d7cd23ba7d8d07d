use std::collections::HashMap;

use rand::Rng;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    config::AppConfig,
    dao::phrase_store::PhraseStore,
    dto::setup::GameSetup,
    error::ServiceError,
    services::{
        allocator::{self, Allocation, Shortfall},
        session::{GameSession, SessionHandle},
    },
    state::game::{Category, GameSettings, GameState, Team},
};

/// Fewest teams a game can be played with.
pub const MIN_TEAMS: usize = 2;

/// Game ready to be played: enough teams and a non-empty phrase pool.
///
/// A session can only be spawned from a prepared game.
#[derive(Debug, Clone)]
pub struct PreparedGame {
    state: GameState,
    shortfall: Option<Shortfall>,
}

impl PreparedGame {
    /// Check that `teams` and `allocation` make a playable game.
    pub fn new(
        settings: GameSettings,
        teams: Vec<Team>,
        allocation: Allocation,
    ) -> Result<Self, ServiceError> {
        if teams.len() < MIN_TEAMS {
            return Err(ServiceError::InvalidConfig(format!(
                "at least {MIN_TEAMS} teams with players are required (got {})",
                teams.len()
            )));
        }
        if allocation.is_empty() {
            return Err(ServiceError::InvalidConfig(
                "no phrases available for the selected categories".into(),
            ));
        }

        let shortfall = allocation.shortfall;
        let state = GameState::new(settings, teams, allocation.phrases);
        info!(
            game_id = %state.id,
            teams = state.teams.len(),
            phrases = state.round.phrase_pool.len(),
            policy = ?state.settings.policy,
            "game prepared"
        );
        Ok(Self { state, shortfall })
    }

    /// State the first round starts from.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Shortfall of the allocation, if any.
    pub fn shortfall(&self) -> Option<Shortfall> {
        self.shortfall
    }

    pub(crate) fn into_parts(self) -> (GameState, Option<Shortfall>) {
        (self.state, self.shortfall)
    }
}

/// Categories offered on the setup screen.
pub async fn list_categories(store: &dyn PhraseStore) -> Result<Vec<Category>, ServiceError> {
    let categories = store.list_categories().await?;
    Ok(categories.into_iter().map(Into::into).collect())
}

/// Teams offered on the setup screen, with their players.
pub async fn list_teams(store: &dyn PhraseStore) -> Result<Vec<Team>, ServiceError> {
    let teams = store.list_teams_with_players().await?;
    Ok(teams.into_iter().map(Into::into).collect())
}

/// Validate `setup`, resolve its teams and allocate the phrase pool.
///
/// A selected team without players, fewer than [`MIN_TEAMS`] teams or an
/// empty pool is a configuration error.
pub async fn prepare_game<R>(
    store: &dyn PhraseStore,
    setup: GameSetup,
    rng: &mut R,
) -> Result<PreparedGame, ServiceError>
where
    R: Rng + Send + ?Sized,
{
    setup.validate()?;

    let mut known: HashMap<_, Team> = list_teams(store)
        .await?
        .into_iter()
        .map(|team| (team.id, team))
        .collect();

    let mut teams = Vec::with_capacity(setup.team_ids.len());
    for team_id in &setup.team_ids {
        let Some(team) = known.remove(team_id) else {
            return Err(ServiceError::NotFound(format!("team `{team_id}` not found")));
        };
        teams.push(team);
    }

    let without_players: Vec<_> = teams
        .iter()
        .filter(|team| !team.is_eligible())
        .map(|team| team.id.to_string())
        .collect();
    if !without_players.is_empty() {
        warn!(teams = ?without_players, "selected teams have no players");
        return Err(ServiceError::InvalidConfig(format!(
            "every selected team needs at least one player (teams without players: {})",
            without_players.join(", ")
        )));
    }
    if teams.len() < MIN_TEAMS {
        return Err(ServiceError::InvalidConfig(format!(
            "at least {MIN_TEAMS} teams with players are required (got {})",
            teams.len()
        )));
    }

    let allocation = allocator::allocate(
        store,
        &setup.category_ids,
        setup.phrases_per_team as usize,
        &teams,
        setup.policy,
        rng,
    )
    .await?;

    PreparedGame::new(setup.settings(), teams, allocation)
}

/// Start the session actor of a prepared game.
pub fn start_session(prepared: PreparedGame, config: &AppConfig) -> SessionHandle {
    GameSession::spawn(prepared, config)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        dao::phrase_store::memory::InMemoryStore,
        state::game::{AllocationPolicy, PhraseStatus},
    };

    async fn store() -> (InMemoryStore, i64, Vec<i64>) {
        let store = InMemoryStore::new();
        let films = store.insert_category("Films").await;
        for text in ["Avatar", "Alien", "Heat", "Jaws", "Up", "Rocky"] {
            store.insert_phrase(films, text).await;
        }
        let red = store.insert_team("#e53935", &["Ana", "Bo"]).await;
        let blue = store.insert_team("#1e88e5", &["Cy", "Di"]).await;
        let empty = store.insert_team("#43a047", &[]).await;
        (store, films, vec![red, blue, empty])
    }

    fn setup(category_ids: Vec<i64>, team_ids: Vec<i64>) -> GameSetup {
        GameSetup {
            category_ids,
            team_ids,
            phrases_per_team: 3,
            round_duration_secs: 30,
            policy: AllocationPolicy::UniqueByTeam,
        }
    }

    #[tokio::test]
    async fn prepares_a_game_for_the_selected_teams() {
        let (store, films, teams) = store().await;
        let mut rng = StdRng::seed_from_u64(3);

        let prepared = prepare_game(&store, setup(vec![films], teams[..2].to_vec()), &mut rng)
            .await
            .unwrap();

        let state = prepared.state();
        let ids: Vec<_> = state.teams.iter().map(|team| team.id).collect();
        assert_eq!(ids, teams[..2].to_vec());
        assert_eq!(state.round.phrase_pool.len(), 6);
        assert!(
            state
                .round
                .phrase_pool
                .iter()
                .all(|phrase| phrase.status == PhraseStatus::Pending)
        );
        assert_eq!(prepared.shortfall(), None);
    }

    #[tokio::test]
    async fn team_without_players_refuses_the_selection() {
        let (store, films, teams) = store().await;
        let mut rng = StdRng::seed_from_u64(3);

        let err = prepare_game(&store, setup(vec![films], teams.clone()), &mut rng)
            .await
            .unwrap_err();
        match err {
            ServiceError::InvalidConfig(message) => {
                assert!(message.ends_with(&format!("players: {})", teams[2])));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_team_is_not_found() {
        let (store, films, teams) = store().await;
        let mut rng = StdRng::seed_from_u64(3);

        let err = prepare_game(&store, setup(vec![films], vec![teams[0], 99]), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn category_without_phrases_is_a_configuration_error() {
        let (store, _, teams) = store().await;
        let empty = store.insert_category("Empty").await;
        let mut rng = StdRng::seed_from_u64(3);

        let err = prepare_game(&store, setup(vec![empty], teams[..2].to_vec()), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn invalid_selection_is_rejected_before_storage() {
        let (store, _, teams) = store().await;
        store.set_offline(true);
        let mut rng = StdRng::seed_from_u64(3);

        let err = prepare_game(&store, setup(Vec::new(), teams), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn storage_failure_is_surfaced() {
        let (store, films, teams) = store().await;
        store.set_offline(true);
        let mut rng = StdRng::seed_from_u64(3);

        let err = prepare_game(&store, setup(vec![films], teams), &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }
}
