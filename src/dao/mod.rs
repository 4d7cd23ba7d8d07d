/// Database model definitions.
pub mod models;
/// Read access to categories, teams and phrases.
pub mod phrase_store;
/// Storage abstraction layer for database operations.
pub mod storage;
