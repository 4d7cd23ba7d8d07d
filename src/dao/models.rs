use serde::{Deserialize, Serialize};

/// Category row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryEntity {
    /// Primary key.
    pub id: i64,
    /// Human readable category name.
    pub name: String,
}

/// Phrase row, owned by its category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhraseEntity {
    /// Primary key.
    pub id: i64,
    /// Phrase to make guess.
    pub text: String,
    /// Category the phrase belongs to.
    pub category_id: i64,
}

/// Player row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Primary key.
    pub id: i64,
    /// Display name chosen for the player.
    pub name: String,
}

/// Team joined with its players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamEntity {
    /// Primary key.
    pub id: i64,
    /// Colour token of the team.
    pub color: String,
    /// Players registered in the team, ordered by name.
    pub players: Vec<PlayerEntity>,
}

/// Team row as stored in a content file: players are referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamRecord {
    /// Primary key.
    pub id: i64,
    /// Colour token of the team.
    pub color: String,
    /// Identifiers of the players of the team.
    #[serde(default)]
    pub player_ids: Vec<i64>,
}

/// Full content of a store, as read from a JSON content file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentFile {
    /// Categories.
    #[serde(default)]
    pub categories: Vec<CategoryEntity>,
    /// Phrases.
    #[serde(default)]
    pub phrases: Vec<PhraseEntity>,
    /// Players.
    #[serde(default)]
    pub players: Vec<PlayerEntity>,
    /// Teams referencing players.
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
}
