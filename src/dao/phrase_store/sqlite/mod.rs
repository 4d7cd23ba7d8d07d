//! SQLite implementation of [`PhraseStore`](crate::dao::phrase_store::PhraseStore).

mod schema;
mod store;

pub use store::SqliteStore;
