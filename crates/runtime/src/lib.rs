//! Runtime for the clan membership engine.
//!
//! This crate puts the pure rule engine of `clan-core` behind a transactional
//! entity store and publishes committed changes as webhook events.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`service`] exposes the operations clients call
//! - [`repository`] provides the in-memory and SQLite entity stores
//! - [`events`] provides the topic-based event bus and payload builders
//! - [`hooks`] defines the notifier contract and URL templating
//! - [`workers`] keeps background tasks internal to the crate
pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod repository;
pub mod runtime;
pub mod service;

mod workers;

pub use config::RuntimeConfig;
pub use error::{Result, ServiceError};
pub use events::{EventBus, HookEvent, HookEventKind, Topic};
pub use hooks::{HookNotifier, render_url};
pub use repository::{
    EntityStore, Hook, InMemoryStore, RepositoryError, SCHEMA_VERSION, SqliteStore, StoreTx,
};
pub use runtime::{ClanRuntime, ClanRuntimeBuilder};
pub use service::{
    ClanDetails, ClanService, ClanUpdate, Clock, ManualClock, NewPlayer, PlayerDetails,
    PlayerMembership, RosterEntry, SystemClock,
};
