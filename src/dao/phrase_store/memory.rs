//! In-process store backed by plain tables, loadable from a JSON content
//! file.

use std::{
    collections::HashSet,
    fs,
    io,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::info;

use crate::dao::{
    models::{CategoryEntity, ContentFile, PhraseEntity, PlayerEntity, TeamEntity, TeamRecord},
    phrase_store::PhraseStore,
    storage::{StorageError, StorageResult},
};

/// Store keeping its tables in memory. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    content: Arc<RwLock<ContentFile>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store serving `content`, after checking its references.
    pub fn from_content(content: ContentFile) -> StorageResult<Self> {
        validate_content(&content)?;
        Ok(Self {
            content: Arc::new(RwLock::new(content)),
            offline: Arc::default(),
        })
    }

    /// Load a JSON content file from disk.
    pub fn load_json(path: &Path) -> StorageResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            StorageError::unavailable(format!("reading content file {}", path.display()), err)
        })?;
        let content: ContentFile = serde_json::from_str(&raw).map_err(|err| {
            StorageError::InvalidContent(format!("{}: {err}", path.display()))
        })?;
        info!(
            path = %path.display(),
            categories = content.categories.len(),
            phrases = content.phrases.len(),
            teams = content.teams.len(),
            "loaded content file"
        );
        Self::from_content(content)
    }

    /// Add a category and return its id.
    pub async fn insert_category(&self, name: impl Into<String>) -> i64 {
        let mut content = self.content.write().await;
        let id = next_id(content.categories.iter().map(|c| c.id));
        content.categories.push(CategoryEntity {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a phrase to `category_id` and return its id.
    pub async fn insert_phrase(&self, category_id: i64, text: impl Into<String>) -> i64 {
        let mut content = self.content.write().await;
        let id = next_id(content.phrases.iter().map(|p| p.id));
        content.phrases.push(PhraseEntity {
            id,
            text: text.into(),
            category_id,
        });
        id
    }

    /// Add a team with freshly created players named `player_names`.
    pub async fn insert_team(&self, color: impl Into<String>, player_names: &[&str]) -> i64 {
        let mut content = self.content.write().await;
        let mut player_ids = Vec::with_capacity(player_names.len());
        for name in player_names {
            let id = next_id(content.players.iter().map(|p| p.id));
            content.players.push(PlayerEntity {
                id,
                name: (*name).to_string(),
            });
            player_ids.push(id);
        }
        let id = next_id(content.teams.iter().map(|t| t.id));
        content.teams.push(TeamRecord {
            id,
            color: color.into(),
            player_ids,
        });
        id
    }

    /// Simulate a backend outage: every read fails while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn read<T, F>(&self, operation: &'static str, f: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&ContentFile) -> T + Send + 'static,
    {
        let content = self.content.clone();
        let offline = self.offline.load(Ordering::SeqCst);
        Box::pin(async move {
            if offline {
                return Err(StorageError::unavailable(
                    operation,
                    io::Error::new(io::ErrorKind::NotConnected, "in-memory store is offline"),
                ));
            }
            let guard = content.read().await;
            Ok(f(&guard))
        })
    }
}

impl PhraseStore for InMemoryStore {
    fn list_categories(&self) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>> {
        self.read("listing categories", |content| {
            let mut categories = content.categories.clone();
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            categories
        })
    }

    fn list_teams_with_players(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        self.read("listing teams", |content| {
            content
                .teams
                .iter()
                .map(|team| {
                    let mut players: Vec<PlayerEntity> = content
                        .players
                        .iter()
                        .filter(|player| team.player_ids.contains(&player.id))
                        .cloned()
                        .collect();
                    players.sort_by(|a, b| a.name.cmp(&b.name));
                    TeamEntity {
                        id: team.id,
                        color: team.color.clone(),
                        players,
                    }
                })
                .collect()
        })
    }

    fn fetch_phrases_by_categories(
        &self,
        category_ids: Vec<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<PhraseEntity>>> {
        self.read("fetching phrases", move |content| {
            content
                .phrases
                .iter()
                .filter(|phrase| category_ids.contains(&phrase.category_id))
                .cloned()
                .collect()
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.read("health check", |_| ())
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn validate_content(content: &ContentFile) -> StorageResult<()> {
    let categories: HashSet<_> = content.categories.iter().map(|c| c.id).collect();
    if let Some(phrase) = content
        .phrases
        .iter()
        .find(|phrase| !categories.contains(&phrase.category_id))
    {
        return Err(StorageError::InvalidContent(format!(
            "phrase `{}` references unknown category `{}`",
            phrase.id, phrase.category_id
        )));
    }

    let players: HashSet<_> = content.players.iter().map(|p| p.id).collect();
    for team in &content.teams {
        if let Some(player_id) = team.player_ids.iter().find(|id| !players.contains(id)) {
            return Err(StorageError::InvalidContent(format!(
                "team `{}` references unknown player `{player_id}`",
                team.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn phrases_are_filtered_by_category() {
        let store = InMemoryStore::new();
        let films = store.insert_category("Films").await;
        let sports = store.insert_category("Sports").await;
        store.insert_phrase(films, "Titanic").await;
        store.insert_phrase(sports, "Tennis").await;
        store.insert_phrase(films, "Matrix").await;

        let phrases = store.fetch_phrases_by_categories(vec![films]).await.unwrap();
        let texts: Vec<_> = phrases.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Titanic", "Matrix"]);
    }

    #[tokio::test]
    async fn teams_are_joined_with_sorted_players() {
        let store = InMemoryStore::new();
        let team = store.insert_team("#e53935", &["Zoe", "Adam"]).await;

        let teams = store.list_teams_with_players().await.unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].id, team);
        let names: Vec<_> = teams[0].players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Adam", "Zoe"]);
    }

    #[tokio::test]
    async fn offline_store_fails_reads() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        assert!(store.list_categories().await.is_err());
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
    }

    #[test]
    fn dangling_references_are_rejected() {
        let content = ContentFile {
            phrases: vec![PhraseEntity {
                id: 1,
                text: "Paris".into(),
                category_id: 9,
            }],
            ..ContentFile::default()
        };
        let err = InMemoryStore::from_content(content).err().unwrap();
        assert!(matches!(err, StorageError::InvalidContent(_)));
    }
}
