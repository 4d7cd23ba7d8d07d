pub mod memory;
#[cfg(feature = "sqlite-store")]
pub mod sqlite;

use crate::dao::models::{CategoryEntity, PhraseEntity, TeamEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer holding players, teams, categories
/// and phrases. Games only ever read from it.
pub trait PhraseStore: Send + Sync {
    /// Every category, ordered by name.
    fn list_categories(&self) -> BoxFuture<'static, StorageResult<Vec<CategoryEntity>>>;
    /// Every team joined with its players.
    fn list_teams_with_players(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    /// Phrases belonging to any of `category_ids`, in no particular order.
    fn fetch_phrases_by_categories(
        &self,
        category_ids: Vec<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<PhraseEntity>>>;
    /// Cheap probe telling whether the backend can serve reads.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
