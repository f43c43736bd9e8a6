//! Error types raised by store implementations.

use clan_core::EntityKind;
use thiserror::Error;

/// Errors surfaced by [`EntityStore`](super::EntityStore) implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("store lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("{entity} {id} already exists")]
    Conflict { entity: EntityKind, id: String },

    #[error("{entity} {id} disappeared during the transaction")]
    Missing { entity: EntityKind, id: String },
}

impl RepositoryError {
    pub(crate) fn json(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
