//! Clan service: the entry points an API layer or the CLI calls.
//!
//! Every operation resolves public ids, loads what it needs and writes its
//! changes inside one store transaction. Hook notifications are sent only
//! after that transaction committed; a failed notification never undoes it.

mod clans;
mod clock;
mod games;
mod hooks;
mod memberships;
mod players;

use std::sync::Arc;

use clan_core::{
    Clan, ClanState, CooldownTracker, EntityKind, Game, GameId, MembershipError, Player,
    PublicId,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::events::HookEventKind;
use crate::hooks::HookNotifier;
use crate::repository::{EntityStore, StoreTx};

pub use clans::{ClanDetails, ClanUpdate, RosterEntry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use players::{NewPlayer, PlayerDetails, PlayerMembership};

/// Notification produced inside a transaction and sent after commit.
struct Notice {
    kind: HookEventKind,
    payload: Value,
}

impl Notice {
    fn new(kind: HookEventKind, payload: Value) -> Self {
        Self { kind, payload }
    }
}

/// Façade over the entity store, the rule engine and the hook notifier.
pub struct ClanService<S> {
    store: Arc<S>,
    notifier: Arc<dyn HookNotifier>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
}

impl<S> Clone for ClanService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: EntityStore> ClanService<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn HookNotifier>) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(SystemClock),
            config: RuntimeConfig::default(),
        }
    }

    /// Replaces the wall clock, mostly for tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Verifies the store answers a trivial query.
    pub fn health_check(&self) -> Result<&str> {
        self.store.transaction(|tx| tx.ping())?;
        debug!("Health check passed");
        Ok(&self.config.healthcheck_text)
    }

    fn publish(&self, game: &PublicId, notices: Vec<Notice>) {
        for notice in notices {
            info!("Dispatching {} hook for game {}", notice.kind, game);
            self.notifier.dispatch(game, notice.kind, notice.payload);
        }
    }
}

fn not_found(entity: EntityKind, id: impl ToString) -> MembershipError {
    MembershipError::NotFound {
        entity,
        id: id.to_string(),
    }
}

fn require_game(tx: &dyn StoreTx, public_id: &PublicId) -> Result<Game> {
    Ok(tx
        .game_by_public_id(public_id)?
        .ok_or_else(|| not_found(EntityKind::Game, public_id))?)
}

fn require_player(tx: &dyn StoreTx, game: GameId, public_id: &PublicId) -> Result<Player> {
    Ok(tx
        .player_by_public_id(game, public_id)?
        .ok_or_else(|| not_found(EntityKind::Player, public_id))?)
}

fn require_clan(tx: &dyn StoreTx, game: GameId, public_id: &PublicId) -> Result<Clan> {
    Ok(tx
        .clan_by_public_id(game, public_id)?
        .ok_or_else(|| not_found(EntityKind::Clan, public_id))?)
}

/// Loads the snapshot a transition runs against.
///
/// Players of active memberships are loaded so ownership can pass on; the
/// `involved` players (target and actor) are added on top.
fn load_clan_state(tx: &dyn StoreTx, clan: Clan, involved: &[Player]) -> Result<ClanState> {
    let memberships = tx.clan_memberships(clan.id)?;
    let cooldowns = CooldownTracker::from_records(tx.clan_cooldowns(clan.id)?);

    let mut state = ClanState::new(clan).with_cooldowns(cooldowns);
    for membership in memberships {
        if membership.is_active() && !state.players.contains_key(&membership.player_id) {
            let player = tx
                .player(membership.player_id)?
                .ok_or_else(|| not_found(EntityKind::Player, membership.player_id))?;
            state = state.with_player(player);
        }
        state = state.with_membership(membership);
    }
    for player in involved {
        state = state.with_player(player.clone());
    }
    Ok(state)
}
