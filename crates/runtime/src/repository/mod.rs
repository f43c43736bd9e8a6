//! Entity stores for games, players, clans, memberships and hooks.
//!
//! The service only talks to the [`EntityStore`] and [`StoreTx`] traits:
//! - [`InMemoryStore`] for tests and throwaway runs
//! - [`SqliteStore`] for durable local storage

mod error;
mod memory;
mod sqlite;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use memory::InMemoryStore;
pub use sqlite::{SCHEMA_VERSION, SqliteStore};
pub use traits::{EntityStore, StoreTx};
pub use types::{Hook, Table};
