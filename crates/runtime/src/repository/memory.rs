//! In-memory store for tests and local runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use clan_core::{
    Clan, ClanId, CooldownRecord, EntityKind, Game, GameId, Membership, Player, PlayerId,
    PublicId,
};

use super::error::{RepositoryError, Result};
use super::traits::{EntityStore, StoreTx};
use super::types::{Hook, Table};
use crate::events::HookEventKind;

#[derive(Clone, Debug, Default)]
struct Tables {
    games: BTreeMap<GameId, Game>,
    players: BTreeMap<PlayerId, Player>,
    clans: BTreeMap<ClanId, Clan>,
    memberships: BTreeMap<(ClanId, PlayerId), Membership>,
    cooldowns: BTreeMap<(ClanId, PlayerId), CooldownRecord>,
    hooks: BTreeMap<u64, Hook>,
    sequences: BTreeMap<Table, u64>,
}

/// Store keeping every table behind one mutex.
///
/// A transaction works on a copy of the tables and swaps it in when the
/// closure succeeds, so transactions are serialized and failed ones leave no
/// trace.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let mut working = MemoryTx {
            tables: tables.clone(),
        };
        let value = f(&mut working)?;
        *tables = working.tables;
        Ok(value)
    }
}

struct MemoryTx {
    tables: Tables,
}

fn conflict(entity: EntityKind, id: &PublicId) -> RepositoryError {
    RepositoryError::Conflict {
        entity,
        id: id.to_string(),
    }
}

fn missing(entity: EntityKind, id: impl ToString) -> RepositoryError {
    RepositoryError::Missing {
        entity,
        id: id.to_string(),
    }
}

impl StoreTx for MemoryTx {
    fn next_id(&mut self, table: Table) -> Result<u64> {
        let sequence = self.tables.sequences.entry(table).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    fn game(&self, id: GameId) -> Result<Option<Game>> {
        Ok(self.tables.games.get(&id).cloned())
    }

    fn game_by_public_id(&self, public_id: &PublicId) -> Result<Option<Game>> {
        Ok(self
            .tables
            .games
            .values()
            .find(|game| &game.public_id == public_id)
            .cloned())
    }

    fn list_games(&self) -> Result<Vec<Game>> {
        Ok(self.tables.games.values().cloned().collect())
    }

    fn insert_game(&mut self, game: &Game) -> Result<()> {
        if self.game_by_public_id(&game.public_id)?.is_some() {
            return Err(conflict(EntityKind::Game, &game.public_id));
        }
        self.tables.games.insert(game.id, game.clone());
        Ok(())
    }

    fn update_game(&mut self, game: &Game) -> Result<()> {
        let slot = self
            .tables
            .games
            .get_mut(&game.id)
            .ok_or_else(|| missing(EntityKind::Game, game.id))?;
        *slot = game.clone();
        Ok(())
    }

    fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        Ok(self.tables.players.get(&id).cloned())
    }

    fn player_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Player>> {
        Ok(self
            .tables
            .players
            .values()
            .find(|player| player.game_id == game && &player.public_id == public_id)
            .cloned())
    }

    fn insert_player(&mut self, player: &Player) -> Result<()> {
        if self
            .player_by_public_id(player.game_id, &player.public_id)?
            .is_some()
        {
            return Err(conflict(EntityKind::Player, &player.public_id));
        }
        self.tables.players.insert(player.id, player.clone());
        Ok(())
    }

    fn update_player(&mut self, player: &Player) -> Result<()> {
        let slot = self
            .tables
            .players
            .get_mut(&player.id)
            .ok_or_else(|| missing(EntityKind::Player, player.id))?;
        *slot = player.clone();
        Ok(())
    }

    fn clan(&self, id: ClanId) -> Result<Option<Clan>> {
        Ok(self.tables.clans.get(&id).cloned())
    }

    fn clan_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Clan>> {
        Ok(self
            .tables
            .clans
            .values()
            .find(|clan| clan.game_id == game && &clan.public_id == public_id)
            .cloned())
    }

    fn list_clans(&self, game: GameId) -> Result<Vec<Clan>> {
        let mut clans: Vec<Clan> = self
            .tables
            .clans
            .values()
            .filter(|clan| clan.game_id == game)
            .cloned()
            .collect();
        clans.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clans)
    }

    fn search_clans(&self, game: GameId, term: &str, limit: usize) -> Result<Vec<Clan>> {
        let needle = term.to_lowercase();
        let mut clans = self.list_clans(game)?;
        clans.retain(|clan| clan.name.to_lowercase().contains(&needle));
        clans.truncate(limit);
        Ok(clans)
    }

    fn insert_clan(&mut self, clan: &Clan) -> Result<()> {
        if self.clan_by_public_id(clan.game_id, &clan.public_id)?.is_some() {
            return Err(conflict(EntityKind::Clan, &clan.public_id));
        }
        self.tables.clans.insert(clan.id, clan.clone());
        Ok(())
    }

    fn update_clan(&mut self, clan: &Clan) -> Result<()> {
        let slot = self
            .tables
            .clans
            .get_mut(&clan.id)
            .ok_or_else(|| missing(EntityKind::Clan, clan.id))?;
        *slot = clan.clone();
        Ok(())
    }

    fn delete_clan(&mut self, id: ClanId) -> Result<()> {
        self.tables.clans.remove(&id);
        self.tables.memberships.retain(|(clan, _), _| *clan != id);
        self.tables.cooldowns.retain(|(clan, _), _| *clan != id);
        Ok(())
    }

    fn clan_memberships(&self, clan: ClanId) -> Result<Vec<Membership>> {
        Ok(self
            .tables
            .memberships
            .range((clan, PlayerId(0))..=(clan, PlayerId(u64::MAX)))
            .map(|(_, membership)| membership.clone())
            .collect())
    }

    fn player_memberships(&self, player: PlayerId) -> Result<Vec<Membership>> {
        Ok(self
            .tables
            .memberships
            .values()
            .filter(|membership| membership.player_id == player)
            .cloned()
            .collect())
    }

    fn upsert_membership(&mut self, membership: &Membership) -> Result<()> {
        self.tables.memberships.insert(
            (membership.clan_id, membership.player_id),
            membership.clone(),
        );
        Ok(())
    }

    fn clan_cooldowns(&self, clan: ClanId) -> Result<Vec<CooldownRecord>> {
        Ok(self
            .tables
            .cooldowns
            .range((clan, PlayerId(0))..=(clan, PlayerId(u64::MAX)))
            .map(|(_, record)| record.clone())
            .collect())
    }

    fn upsert_cooldown(&mut self, record: &CooldownRecord) -> Result<()> {
        self.tables
            .cooldowns
            .insert((record.clan_id, record.player_id), record.clone());
        Ok(())
    }

    fn hooks(&self, game: GameId, kind: Option<HookEventKind>) -> Result<Vec<Hook>> {
        Ok(self
            .tables
            .hooks
            .values()
            .filter(|hook| hook.game_id == game)
            .filter(|hook| kind.is_none_or(|kind| hook.event_kind == kind))
            .cloned()
            .collect())
    }

    fn insert_hook(&mut self, hook: &Hook) -> Result<()> {
        let taken = self
            .tables
            .hooks
            .values()
            .any(|existing| existing.game_id == hook.game_id && existing.public_id == hook.public_id);
        if taken {
            return Err(conflict(EntityKind::Hook, &hook.public_id));
        }
        self.tables.hooks.insert(hook.id, hook.clone());
        Ok(())
    }

    fn delete_hook(&mut self, game: GameId, public_id: &PublicId) -> Result<bool> {
        let before = self.tables.hooks.len();
        self.tables
            .hooks
            .retain(|_, hook| !(hook.game_id == game && &hook.public_id == public_id));
        Ok(self.tables.hooks.len() != before)
    }
}
