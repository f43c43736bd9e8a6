//! Store contracts used by the clan service.

use clan_core::{
    ActionKind, Clan, ClanId, CooldownRecord, Game, GameId, Membership, Player, PlayerId,
    PublicId, StateDelta,
};

use super::error::{RepositoryError, Result};
use super::types::{Hook, Table};
use crate::events::HookEventKind;

/// Transactional entity store.
///
/// Every service operation runs inside one [`EntityStore::transaction`] call.
/// Implementations must make the closure's reads and writes serializable with
/// respect to other transactions and discard every write when it returns `Err`.
pub trait EntityStore: Send + Sync {
    fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E>,
        E: From<RepositoryError>;
}

/// Reads and writes available inside a store transaction.
pub trait StoreTx {
    /// Returns the next unused id of `table`.
    fn next_id(&mut self, table: Table) -> Result<u64>;

    /// Round trip used by health checks.
    fn ping(&mut self) -> Result<()>;

    // Games
    fn game(&self, id: GameId) -> Result<Option<Game>>;
    fn game_by_public_id(&self, public_id: &PublicId) -> Result<Option<Game>>;
    fn list_games(&self) -> Result<Vec<Game>>;
    /// Fails with [`RepositoryError::Conflict`] when the public id is taken.
    fn insert_game(&mut self, game: &Game) -> Result<()>;
    fn update_game(&mut self, game: &Game) -> Result<()>;

    // Players
    fn player(&self, id: PlayerId) -> Result<Option<Player>>;
    fn player_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Player>>;
    fn insert_player(&mut self, player: &Player) -> Result<()>;
    fn update_player(&mut self, player: &Player) -> Result<()>;

    // Clans
    fn clan(&self, id: ClanId) -> Result<Option<Clan>>;
    fn clan_by_public_id(&self, game: GameId, public_id: &PublicId) -> Result<Option<Clan>>;
    fn list_clans(&self, game: GameId) -> Result<Vec<Clan>>;
    /// Clans whose name contains `term`, ignoring case, ordered by name.
    fn search_clans(&self, game: GameId, term: &str, limit: usize) -> Result<Vec<Clan>>;
    fn insert_clan(&mut self, clan: &Clan) -> Result<()>;
    fn update_clan(&mut self, clan: &Clan) -> Result<()>;
    /// Removes the clan together with its memberships and cooldown records.
    fn delete_clan(&mut self, id: ClanId) -> Result<()>;

    // Memberships
    fn clan_memberships(&self, clan: ClanId) -> Result<Vec<Membership>>;
    fn player_memberships(&self, player: PlayerId) -> Result<Vec<Membership>>;
    /// Inserts or replaces the record of the membership's (clan, player) pair.
    fn upsert_membership(&mut self, membership: &Membership) -> Result<()>;

    // Cooldowns
    fn clan_cooldowns(&self, clan: ClanId) -> Result<Vec<CooldownRecord>>;
    fn upsert_cooldown(&mut self, record: &CooldownRecord) -> Result<()>;

    // Hooks
    fn hooks(&self, game: GameId, kind: Option<HookEventKind>) -> Result<Vec<Hook>>;
    fn insert_hook(&mut self, hook: &Hook) -> Result<()>;
    /// Returns false when no hook had that public id.
    fn delete_hook(&mut self, game: GameId, public_id: &PublicId) -> Result<bool>;

    /// Writes the records of an engine delta.
    fn apply_delta(&mut self, delta: &StateDelta) -> Result<()> {
        if let Some(clan) = &delta.clan {
            if delta.action == ActionKind::Found {
                self.insert_clan(clan)?;
            } else {
                self.update_clan(clan)?;
            }
        }
        for player in &delta.players {
            self.update_player(player)?;
        }
        if delta.clan_dissolved {
            let dissolved = delta
                .clan
                .as_ref()
                .map(|clan| clan.id)
                .or_else(|| delta.memberships.first().map(|m| m.clan_id));
            if let Some(id) = dissolved {
                return self.delete_clan(id);
            }
        }
        for membership in &delta.memberships {
            self.upsert_membership(membership)?;
        }
        for record in &delta.cooldowns {
            self.upsert_cooldown(record)?;
        }
        Ok(())
    }
}
