//! SQLite schema definitions.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::repository::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Creates the tables on a fresh database.
pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version = schema_version(conn)?;

    if current_version == 0 {
        info!("Creating clan store schema v{}", SCHEMA_VERSION);
        conn.execute_batch(SCHEMA)?;
        conn.execute("DELETE FROM schema_version", [])?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    } else {
        info!("Clan store schema is up to date (v{})", current_version);
    }

    Ok(())
}

fn schema_version(conn: &Connection) -> Result<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let version = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(version.unwrap_or(0))
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    id INTEGER PRIMARY KEY,
    public_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    membership_levels TEXT NOT NULL,
    min_membership_level INTEGER NOT NULL,
    max_membership_level INTEGER NOT NULL,
    rules TEXT NOT NULL,
    metadata TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS players (
    id INTEGER PRIMARY KEY,
    game_id INTEGER NOT NULL REFERENCES games(id),
    public_id TEXT NOT NULL,
    name TEXT NOT NULL,
    metadata TEXT NOT NULL,
    membership_count INTEGER NOT NULL,
    ownership_count INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (game_id, public_id)
);

CREATE TABLE IF NOT EXISTS clans (
    id INTEGER PRIMARY KEY,
    game_id INTEGER NOT NULL REFERENCES games(id),
    public_id TEXT NOT NULL,
    name TEXT NOT NULL,
    owner_id INTEGER NOT NULL REFERENCES players(id),
    membership_count INTEGER NOT NULL,
    allow_application INTEGER NOT NULL,
    auto_join INTEGER NOT NULL,
    metadata TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (game_id, public_id)
);

CREATE INDEX IF NOT EXISTS idx_clans_name ON clans(game_id, name);

CREATE TABLE IF NOT EXISTS memberships (
    game_id INTEGER NOT NULL,
    clan_id INTEGER NOT NULL REFERENCES clans(id),
    player_id INTEGER NOT NULL REFERENCES players(id),
    level INTEGER NOT NULL,
    approved INTEGER NOT NULL,
    denied INTEGER NOT NULL,
    deleted INTEGER NOT NULL,
    requestor_id INTEGER NOT NULL,
    approver_id INTEGER,
    denier_id INTEGER,
    deleted_by INTEGER,
    message TEXT,
    requested_at INTEGER NOT NULL,
    approved_at INTEGER,
    denied_at INTEGER,
    deleted_at INTEGER,
    PRIMARY KEY (clan_id, player_id)
);

CREATE INDEX IF NOT EXISTS idx_memberships_player ON memberships(player_id);

CREATE TABLE IF NOT EXISTS cooldowns (
    clan_id INTEGER NOT NULL,
    player_id INTEGER NOT NULL,
    last_deny INTEGER,
    last_delete INTEGER,
    PRIMARY KEY (clan_id, player_id)
);

CREATE TABLE IF NOT EXISTS hooks (
    id INTEGER PRIMARY KEY,
    game_id INTEGER NOT NULL REFERENCES games(id),
    public_id TEXT NOT NULL,
    event_kind TEXT NOT NULL,
    url TEXT NOT NULL,
    UNIQUE (game_id, public_id)
);

CREATE INDEX IF NOT EXISTS idx_hooks_kind ON hooks(game_id, event_kind);
"#;
