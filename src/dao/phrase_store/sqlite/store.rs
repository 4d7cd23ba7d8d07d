use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use futures::future::BoxFuture;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::dao::{
    models::{CategoryEntity, PhraseEntity, PlayerEntity, TeamEntity},
    phrase_store::PhraseStore,
    storage::{StorageError, StorageResult},
};

use super::schema::ensure_schema;

/// SQLite-backed store. Queries run on the blocking thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and ensure the schema.
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let location = path.display().to_string();
        let conn = tokio::task::spawn_blocking(move || -> rusqlite::Result<Connection> {
            let conn = Connection::open(&path)?;
            ensure_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|err| StorageError::unavailable("opening sqlite database", err))?
        .map_err(|err| StorageError::unavailable(format!("opening {location}"), err))?;

        info!(path = %location, "opened sqlite phrase store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: location.into(),
        })
    }

    /// Private in-memory database, mostly useful for tests.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .and_then(|conn| ensure_schema(&conn).map(|()| conn))
            .map_err(|err| StorageError::unavailable("opening in-memory sqlite", err))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: ":memory:".into(),
        })
    }

    /// Add a category and return its id.
    pub async fn add_category(&self, name: impl Into<String>) -> StorageResult<i64> {
        let name = name.into();
        self.run("adding category", move |conn| {
            conn.execute(
                "INSERT INTO categories (name, createdAt) VALUES (?1, ?2)",
                params![name, now_millis()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Add a phrase to `category_id` and return its id.
    pub async fn add_phrase(&self, category_id: i64, text: impl Into<String>) -> StorageResult<i64> {
        let text = text.into();
        self.run("adding phrase", move |conn| {
            conn.execute(
                "INSERT INTO phrases (text, categoryId, createdAt) VALUES (?1, ?2, ?3)",
                params![text, category_id, now_millis()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Add a player and return its id.
    pub async fn add_player(&self, name: impl Into<String>) -> StorageResult<i64> {
        let name = name.into();
        self.run("adding player", move |conn| {
            conn.execute(
                "INSERT INTO players (name, createdAt) VALUES (?1, ?2)",
                params![name, now_millis()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Add a team with the given colour and return its id.
    pub async fn add_team(&self, color: impl Into<String>) -> StorageResult<i64> {
        let color = color.into();
        self.run("adding team", move |conn| {
            conn.execute(
                "INSERT INTO teams (color, createdAt) VALUES (?1, ?2)",
                params![color, now_millis()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Register `player_id` in `team_id`. Adding a player twice is a no-op.
    pub async fn add_player_to_team(&self, team_id: i64, player_id: i64) -> StorageResult<()> {
        self.run("adding player to team", move |conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM team_players WHERE teamId = ?1 AND playerId = ?2",
                    params![team_id, player_id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_none() {
                conn.execute(
                    "INSERT INTO team_players (teamId, playerId) VALUES (?1, ?2)",
                    params![team_id, player_id],
                )?;
            }
            Ok(())
        })
        .await
    }

    fn run<T, F>(&self, operation: &'static str, f: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        let location = self.location.clone();
        Box::pin(async move {
            let result = tokio::task::spawn_blocking(move || {
                let guard = conn.lock().map_err(|_| {
                    StorageError::InvalidContent("sqlite connection lock poisoned".into())
                })?;
                f(&guard).map_err(|err| StorageError::unavailable(operation, err))
            })
            .await
            .map_err(|err| StorageError::unavailable(operation, err))?;
            debug!(path = %location, operation, ok = result.is_ok(), "sqlite query");
            result
        })
    }
}

impl PhraseStore for SqliteStore {
    fn list_categories(&self) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>> {
        self.run("listing categories", |conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt.query_map([], |row| {
                Ok(CategoryEntity {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            rows.collect()
        })
    }

    fn list_teams_with_players(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        self.run("listing teams", |conn| {
            let mut teams_stmt = conn.prepare("SELECT id, color FROM teams ORDER BY id")?;
            let teams = teams_stmt
                .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut players_stmt = conn.prepare(
                "SELECT p.id, p.name FROM players p \
                 INNER JOIN team_players tp ON tp.playerId = p.id \
                 WHERE tp.teamId = ?1 ORDER BY p.name",
            )?;

            teams
                .into_iter()
                .map(|(id, color)| -> rusqlite::Result<TeamEntity> {
                    let players = players_stmt
                        .query_map(params![id], |row| {
                            Ok(PlayerEntity {
                                id: row.get(0)?,
                                name: row.get(1)?,
                            })
                        })?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    Ok(TeamEntity { id, color, players })
                })
                .collect()
        })
    }

    fn fetch_phrases_by_categories(
        &self,
        category_ids: Vec<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<PhraseEntity>>> {
        self.run("fetching phrases", move |conn| {
            if category_ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; category_ids.len()].join(",");
            let sql = format!(
                "SELECT id, text, categoryId FROM phrases WHERE categoryId IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(category_ids.iter()), |row| {
                Ok(PhraseEntity {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    category_id: row.get(2)?,
                })
            })?;
            rows.collect()
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.run("health check", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
        })
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn teams_are_listed_with_their_players() {
        let store = SqliteStore::open_in_memory().unwrap();
        let team = store.add_team("#43a047").await.unwrap();
        let zoe = store.add_player("Zoe").await.unwrap();
        let adam = store.add_player("Adam").await.unwrap();
        store.add_player_to_team(team, zoe).await.unwrap();
        store.add_player_to_team(team, adam).await.unwrap();
        store.add_player_to_team(team, adam).await.unwrap();
        store.add_team("#fdd835").await.unwrap();

        let teams = store.list_teams_with_players().await.unwrap();
        assert_eq!(teams.len(), 2);
        let names: Vec<_> = teams[0].players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Adam", "Zoe"]);
        assert!(teams[1].players.is_empty());
    }

    #[tokio::test]
    async fn phrases_are_fetched_for_selected_categories_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let films = store.add_category("Films").await.unwrap();
        let cities = store.add_category("Cities").await.unwrap();
        let sports = store.add_category("Sports").await.unwrap();
        store.add_phrase(films, "Avatar").await.unwrap();
        store.add_phrase(cities, "Tokyo").await.unwrap();
        store.add_phrase(sports, "Golf").await.unwrap();

        let mut texts: Vec<_> = store
            .fetch_phrases_by_categories(vec![films, cities])
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        texts.sort();
        assert_eq!(texts, vec!["Avatar", "Tokyo"]);

        assert!(
            store
                .fetch_phrases_by_categories(Vec::new())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn categories_are_sorted_by_name() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_category("Sports").await.unwrap();
        store.add_category("Films").await.unwrap();

        let names: Vec<_> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Films", "Sports"]);
        assert!(store.health_check().await.is_ok());
    }
}
