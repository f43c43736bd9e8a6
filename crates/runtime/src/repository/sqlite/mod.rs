//! SQLite-backed entity store.
//!
//! ## Tables
//!
//! - `games` - ladder and rules stored as JSON documents, derived bounds as columns
//! - `players`, `clans` - unique per (game, public id)
//! - `memberships` - one row per (clan, player) pair
//! - `cooldowns` - latest deny/delete per (clan, player) pair
//! - `hooks` - webhook registrations per game and event kind
//!
//! Every transaction starts with `BEGIN IMMEDIATE`, which takes the write lock
//! up front and makes transactions serializable.

mod schema;

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use clan_core::{
    Clan, ClanId, CooldownRecord, EntityKind, Game, GameId, Membership, Player, PlayerId,
    PublicId, Timestamp,
};
use rusqlite::types::Type;
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Params, Row, TransactionBehavior, params,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::{RepositoryError, Result};
use super::traits::{EntityStore, StoreTx};
use super::types::{Hook, Table};
use crate::events::HookEventKind;

pub use schema::SCHEMA_VERSION;

/// Store persisting every table in one SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening SQLite store at {:?}", path);

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite store");
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl EntityStore for SqliteStore {
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        // Dropping `tx` without committing rolls it back.
        let value = f(&mut SqliteTx { conn: &tx })?;
        tx.commit().map_err(RepositoryError::from)?;
        Ok(value)
    }
}

struct SqliteTx<'c> {
    conn: &'c Connection,
}

impl SqliteTx<'_> {
    fn query_one<T, P>(&self, sql: &str, params: P, map: fn(&Row<'_>) -> rusqlite::Result<T>) -> Result<Option<T>>
    where
        P: Params,
    {
        Ok(self.conn.query_row(sql, params, map).optional()?)
    }

    fn query_all<T, P>(&self, sql: &str, params: P, map: fn(&Row<'_>) -> rusqlite::Result<T>) -> Result<Vec<T>>
    where
        P: Params,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Runs an INSERT, reporting unique-key violations as conflicts.
    fn insert<P: Params>(&self, sql: &str, params: P, entity: EntityKind, id: &PublicId) -> Result<()> {
        match self.conn.execute(sql, params) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(error, _))
                if error.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepositoryError::Conflict {
                    entity,
                    id: id.to_string(),
                })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Runs an UPDATE that must touch exactly one row.
    fn update<P: Params>(&self, sql: &str, params: P, entity: EntityKind, id: u64) -> Result<()> {
        if self.conn.execute(sql, params)? == 0 {
            return Err(RepositoryError::Missing {
                entity,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(RepositoryError::json)
}

fn conversion_error<E>(row: &Row<'_>, name: &str, error: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(name).unwrap_or(0);
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, name: &str) -> rusqlite::Result<T> {
    let text: String = row.get(name)?;
    serde_json::from_str(&text).map_err(|error| conversion_error(row, name, error))
}

fn timestamp(row: &Row<'_>, name: &str) -> rusqlite::Result<Timestamp> {
    row.get(name).map(Timestamp)
}

fn optional_timestamp(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<Timestamp>> {
    Ok(row.get::<_, Option<i64>>(name)?.map(Timestamp))
}

fn optional_player(row: &Row<'_>, name: &str) -> rusqlite::Result<Option<PlayerId>> {
    Ok(row.get::<_, Option<u64>>(name)?.map(PlayerId))
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<Game> {
    Ok(Game {
        id: GameId(row.get("id")?),
        public_id: PublicId::new(row.get::<_, String>("public_id")?),
        name: row.get("name")?,
        membership_levels: json_column(row, "membership_levels")?,
        min_membership_level: row.get("min_membership_level")?,
        max_membership_level: row.get("max_membership_level")?,
        rules: json_column(row, "rules")?,
        metadata: json_column(row, "metadata")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: PlayerId(row.get("id")?),
        game_id: GameId(row.get("game_id")?),
        public_id: PublicId::new(row.get::<_, String>("public_id")?),
        name: row.get("name")?,
        metadata: json_column(row, "metadata")?,
        membership_count: row.get("membership_count")?,
        ownership_count: row.get("ownership_count")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn clan_from_row(row: &Row<'_>) -> rusqlite::Result<Clan> {
    Ok(Clan {
        id: ClanId(row.get("id")?),
        game_id: GameId(row.get("game_id")?),
        public_id: PublicId::new(row.get::<_, String>("public_id")?),
        name: row.get("name")?,
        owner_id: PlayerId(row.get("owner_id")?),
        membership_count: row.get("membership_count")?,
        allow_application: row.get("allow_application")?,
        auto_join: row.get("auto_join")?,
        metadata: json_column(row, "metadata")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

fn membership_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        game_id: GameId(row.get("game_id")?),
        clan_id: ClanId(row.get("clan_id")?),
        player_id: PlayerId(row.get("player_id")?),
        level: row.get("level")?,
        approved: row.get("approved")?,
        denied: row.get("denied")?,
        deleted: row.get("deleted")?,
        requestor_id: PlayerId(row.get("requestor_id")?),
        approver_id: optional_player(row, "approver_id")?,
        denier_id: optional_player(row, "denier_id")?,
        deleted_by: optional_player(row, "deleted_by")?,
        message: row.get("message")?,
        requested_at: timestamp(row, "requested_at")?,
        approved_at: optional_timestamp(row, "approved_at")?,
        denied_at: optional_timestamp(row, "denied_at")?,
        deleted_at: optional_timestamp(row, "deleted_at")?,
    })
}

fn cooldown_from_row(row: &Row<'_>) -> rusqlite::Result<CooldownRecord> {
    Ok(CooldownRecord {
        clan_id: ClanId(row.get("clan_id")?),
        player_id: PlayerId(row.get("player_id")?),
        last_deny: optional_timestamp(row, "last_deny")?,
        last_delete: optional_timestamp(row, "last_delete")?,
    })
}

fn hook_from_row(row: &Row<'_>) -> rusqlite::Result<Hook> {
    let kind: String = row.get("event_kind")?;
    Ok(Hook {
        id: row.get("id")?,
        game_id: GameId(row.get("game_id")?),
        public_id: PublicId::new(row.get::<_, String>("public_id")?),
        event_kind: HookEventKind::from_str(&kind)
            .map_err(|error| conversion_error(row, "event_kind", error))?,
        url: row.get("url")?,
    })
}

impl StoreTx for SqliteTx<'_> {
    fn next_id(&mut self, table: Table) -> Result<u64> {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}");
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    fn ping(&mut self) -> Result<()> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(RepositoryError::CorruptedData(format!(
                "SELECT 1 returned {one}"
            )));
        }
        Ok(())
    }

    fn game(&self, id: GameId) -> Result<Option<Game>> {
        self.query_one("SELECT * FROM games WHERE id = ?1", [id.0], game_from_row)
    }

    fn game_by_public_id(&self, public_id: &PublicId) -> Result<Option<Game>> {
        self.query_one(
            "SELECT * FROM games WHERE public_id = ?1",
            [public_id.as_str()],
            game_from_row,
        )
    }

    fn list_games(&self) -> Result<Vec<Game>> {
        self.query_all("SELECT * FROM games ORDER BY id", [], game_from_row)
    }

    fn insert_game(&mut self, game: &Game) -> Result<()> {
        self.insert(
            "INSERT INTO games (id, public_id, name, membership_levels, min_membership_level,
                max_membership_level, rules, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                game.id.0,
                game.public_id.as_str(),
                game.name,
                to_json(&game.membership_levels)?,
                game.min_membership_level,
                game.max_membership_level,
                to_json(&game.rules)?,
                to_json(&game.metadata)?,
                game.created_at.0,
                game.updated_at.0,
            ],
            EntityKind::Game,
            &game.public_id,
        )
    }

    fn update_game(&mut self, game: &Game) -> Result<()> {
        self.update(
            "UPDATE games SET name = ?2, membership_levels = ?3, min_membership_level = ?4,
                max_membership_level = ?5, rules = ?6, metadata = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                game.id.0,
                game.name,
                to_json(&game.membership_levels)?,
                game.min_membership_level,
                game.max_membership_level,
                to_json(&game.rules)?,
                to_json(&game.metadata)?,
                game.updated_at.0,
            ],
            EntityKind::Game,
            game.id.0,
        )
    }

    fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        self.query_one("SELECT * FROM players WHERE id = ?1", [id.0], player_from_row)
    }

    fn player_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Player>> {
        self.query_one(
            "SELECT * FROM players WHERE game_id = ?1 AND public_id = ?2",
            params![game.0, public_id.as_str()],
            player_from_row,
        )
    }

    fn insert_player(&mut self, player: &Player) -> Result<()> {
        self.insert(
            "INSERT INTO players (id, game_id, public_id, name, metadata, membership_count,
                ownership_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                player.id.0,
                player.game_id.0,
                player.public_id.as_str(),
                player.name,
                to_json(&player.metadata)?,
                player.membership_count,
                player.ownership_count,
                player.created_at.0,
                player.updated_at.0,
            ],
            EntityKind::Player,
            &player.public_id,
        )
    }

    fn update_player(&mut self, player: &Player) -> Result<()> {
        self.update(
            "UPDATE players SET name = ?2, metadata = ?3, membership_count = ?4,
                ownership_count = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                player.id.0,
                player.name,
                to_json(&player.metadata)?,
                player.membership_count,
                player.ownership_count,
                player.updated_at.0,
            ],
            EntityKind::Player,
            player.id.0,
        )
    }

    fn clan(&self, id: ClanId) -> Result<Option<Clan>> {
        self.query_one("SELECT * FROM clans WHERE id = ?1", [id.0], clan_from_row)
    }

    fn clan_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Clan>> {
        self.query_one(
            "SELECT * FROM clans WHERE game_id = ?1 AND public_id = ?2",
            params![game.0, public_id.as_str()],
            clan_from_row,
        )
    }

    fn list_clans(&self, game: GameId) -> Result<Vec<Clan>> {
        self.query_all(
            "SELECT * FROM clans WHERE game_id = ?1 ORDER BY name",
            [game.0],
            clan_from_row,
        )
    }

    fn search_clans(&self, game: GameId, term: &str, limit: usize) -> Result<Vec<Clan>> {
        self.query_all(
            "SELECT * FROM clans
             WHERE game_id = ?1 AND instr(lower(name), lower(?2)) > 0
             ORDER BY name LIMIT ?3",
            params![game.0, term, limit as i64],
            clan_from_row,
        )
    }

    fn insert_clan(&mut self, clan: &Clan) -> Result<()> {
        self.insert(
            "INSERT INTO clans (id, game_id, public_id, name, owner_id, membership_count,
                allow_application, auto_join, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                clan.id.0,
                clan.game_id.0,
                clan.public_id.as_str(),
                clan.name,
                clan.owner_id.0,
                clan.membership_count,
                clan.allow_application,
                clan.auto_join,
                to_json(&clan.metadata)?,
                clan.created_at.0,
                clan.updated_at.0,
            ],
            EntityKind::Clan,
            &clan.public_id,
        )
    }

    fn update_clan(&mut self, clan: &Clan) -> Result<()> {
        self.update(
            "UPDATE clans SET name = ?2, owner_id = ?3, membership_count = ?4,
                allow_application = ?5, auto_join = ?6, metadata = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                clan.id.0,
                clan.name,
                clan.owner_id.0,
                clan.membership_count,
                clan.allow_application,
                clan.auto_join,
                to_json(&clan.metadata)?,
                clan.updated_at.0,
            ],
            EntityKind::Clan,
            clan.id.0,
        )
    }

    fn delete_clan(&mut self, id: ClanId) -> Result<()> {
        self.conn
            .execute("DELETE FROM memberships WHERE clan_id = ?1", [id.0])?;
        self.conn
            .execute("DELETE FROM cooldowns WHERE clan_id = ?1", [id.0])?;
        self.conn.execute("DELETE FROM clans WHERE id = ?1", [id.0])?;
        Ok(())
    }

    fn clan_memberships(&self, clan: ClanId) -> Result<Vec<Membership>> {
        self.query_all(
            "SELECT * FROM memberships WHERE clan_id = ?1 ORDER BY player_id",
            [clan.0],
            membership_from_row,
        )
    }

    fn player_memberships(&self, player: PlayerId) -> Result<Vec<Membership>> {
        self.query_all(
            "SELECT * FROM memberships WHERE player_id = ?1 ORDER BY clan_id",
            [player.0],
            membership_from_row,
        )
    }

    fn upsert_membership(&mut self, membership: &Membership) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO memberships (game_id, clan_id, player_id, level, approved,
                denied, deleted, requestor_id, approver_id, denier_id, deleted_by, message,
                requested_at, approved_at, denied_at, deleted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                membership.game_id.0,
                membership.clan_id.0,
                membership.player_id.0,
                membership.level,
                membership.approved,
                membership.denied,
                membership.deleted,
                membership.requestor_id.0,
                membership.approver_id.map(|id| id.0),
                membership.denier_id.map(|id| id.0),
                membership.deleted_by.map(|id| id.0),
                membership.message,
                membership.requested_at.0,
                membership.approved_at.map(|at| at.0),
                membership.denied_at.map(|at| at.0),
                membership.deleted_at.map(|at| at.0),
            ],
        )?;
        Ok(())
    }

    fn clan_cooldowns(&self, clan: ClanId) -> Result<Vec<CooldownRecord>> {
        self.query_all(
            "SELECT * FROM cooldowns WHERE clan_id = ?1 ORDER BY player_id",
            [clan.0],
            cooldown_from_row,
        )
    }

    fn upsert_cooldown(&mut self, record: &CooldownRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO cooldowns (clan_id, player_id, last_deny, last_delete)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.clan_id.0,
                record.player_id.0,
                record.last_deny.map(|at| at.0),
                record.last_delete.map(|at| at.0),
            ],
        )?;
        Ok(())
    }

    fn hooks(&self, game: GameId, kind: Option<HookEventKind>) -> Result<Vec<Hook>> {
        match kind {
            Some(kind) => self.query_all(
                "SELECT * FROM hooks WHERE game_id = ?1 AND event_kind = ?2 ORDER BY id",
                params![game.0, kind.as_str()],
                hook_from_row,
            ),
            None => self.query_all(
                "SELECT * FROM hooks WHERE game_id = ?1 ORDER BY id",
                [game.0],
                hook_from_row,
            ),
        }
    }

    fn insert_hook(&mut self, hook: &Hook) -> Result<()> {
        self.insert(
            "INSERT INTO hooks (id, game_id, public_id, event_kind, url)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hook.id,
                hook.game_id.0,
                hook.public_id.as_str(),
                hook.event_kind.as_str(),
                hook.url,
            ],
            EntityKind::Hook,
            &hook.public_id,
        )
    }

    fn delete_hook(&mut self, game: GameId, public_id: &PublicId) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM hooks WHERE game_id = ?1 AND public_id = ?2",
            params![game.0, public_id.as_str()],
        )?;
        Ok(removed > 0)
    }
}
