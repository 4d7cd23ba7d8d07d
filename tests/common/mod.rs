#![allow(dead_code)]

use phrase_rush::{
    dao::phrase_store::memory::InMemoryStore,
    dto::setup::GameSetup,
    state::game::{AllocationPolicy, CategoryId, TeamId},
};

pub const RED: &str = "#e53935";
pub const BLUE: &str = "#1e88e5";

/// Library with `phrases` distinct phrases spread over two categories and
/// two teams of two players.
pub async fn library(phrases: usize) -> (InMemoryStore, Vec<CategoryId>, Vec<TeamId>) {
    let store = InMemoryStore::new();
    let movies = store.insert_category("Movies").await;
    let places = store.insert_category("Places").await;
    for index in 0..phrases {
        let category = if index % 2 == 0 { movies } else { places };
        store
            .insert_phrase(category, format!("phrase number {index}"))
            .await;
    }
    let red = store.insert_team(RED, &["Alice", "Bruno"]).await;
    let blue = store.insert_team(BLUE, &["Chloe", "David"]).await;
    (store, vec![movies, places], vec![red, blue])
}

pub fn setup(
    category_ids: Vec<CategoryId>,
    team_ids: Vec<TeamId>,
    phrases_per_team: u32,
    round_duration_secs: u32,
    policy: AllocationPolicy,
) -> GameSetup {
    GameSetup {
        category_ids,
        team_ids,
        phrases_per_team,
        round_duration_secs,
        policy,
    }
}
