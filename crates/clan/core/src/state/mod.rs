//! Clan snapshot evaluated by the engine.
//!
//! [`ClanState`] holds everything a single transition may read or write: the
//! clan, the players involved, every membership record of the clan and the
//! cooldown records of its pairs. Callers load it inside a store transaction and
//! persist the resulting [`StateDelta`] in that same transaction.

mod delta;
mod entities;
mod ids;

use std::collections::BTreeMap;

pub use delta::StateDelta;
pub use entities::{Clan, Membership, MembershipStatus, Player, RequestKind};
pub use ids::{ClanId, GameId, PlayerId, PublicId, Timestamp};

use crate::cooldown::CooldownTracker;
use crate::error::EntityKind;
use crate::policy::GamePolicy;
use crate::transition::MembershipError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClanState {
    pub clan: Clan,
    pub players: BTreeMap<PlayerId, Player>,
    /// Every membership record of the clan, keyed by player.
    pub memberships: BTreeMap<PlayerId, Membership>,
    pub cooldowns: CooldownTracker,
    /// Set when the last member left and the clan must be removed.
    pub dissolved: bool,
}

impl ClanState {
    pub fn new(clan: Clan) -> Self {
        Self {
            clan,
            players: BTreeMap::new(),
            memberships: BTreeMap::new(),
            cooldowns: CooldownTracker::new(),
            dissolved: false,
        }
    }

    pub fn with_player(mut self, player: Player) -> Self {
        self.players.insert(player.id, player);
        self
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.memberships.insert(membership.player_id, membership);
        self
    }

    pub fn with_cooldowns(mut self, cooldowns: CooldownTracker) -> Self {
        self.cooldowns = cooldowns;
        self
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, MembershipError> {
        self.players.get(&id).ok_or_else(|| missing_player(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, MembershipError> {
        self.players.get_mut(&id).ok_or_else(|| missing_player(id))
    }

    pub fn membership(&self, player: PlayerId) -> Option<&Membership> {
        self.memberships.get(&player)
    }

    pub fn membership_mut(&mut self, player: PlayerId) -> Option<&mut Membership> {
        self.memberships.get_mut(&player)
    }

    /// Rank of the player's active membership, if they are an active member.
    pub fn active_rank(&self, player: PlayerId) -> Option<i64> {
        self.membership(player)
            .filter(|membership| membership.is_active())
            .map(|membership| membership.level)
    }

    pub fn is_owner(&self, player: PlayerId) -> bool {
        self.clan.owner_id == player
    }

    pub fn active_members(&self) -> impl Iterator<Item = &Membership> {
        self.memberships.values().filter(|m| m.is_active())
    }

    /// Public id of a loaded player, falling back to the internal id.
    pub fn public_id_of(&self, player: PlayerId) -> PublicId {
        self.players
            .get(&player)
            .map(|p| p.public_id.clone())
            .unwrap_or_else(|| PublicId::new(player.to_string()))
    }

    /// Structural invariants that must hold after every transition.
    pub fn check_invariants(&self) -> Result<(), MembershipError> {
        if self.dissolved {
            return Ok(());
        }

        let active = self.active_members().count();
        if active != self.clan.membership_count as usize {
            return Err(MembershipError::InvariantViolated(
                "clan member count does not match active memberships",
            ));
        }

        if self.active_rank(self.clan.owner_id).is_none() {
            return Err(MembershipError::InvariantViolated(
                "clan owner must be an active member",
            ));
        }

        Ok(())
    }

    /// Fails if the player's active membership sits outside the ladder.
    pub fn check_level(&self, player: PlayerId, policy: &GamePolicy) -> Result<(), MembershipError> {
        match self.active_rank(player) {
            Some(level) if !policy.ladder().contains_rank(level) => {
                Err(MembershipError::UnknownLevel {
                    player: self.public_id_of(player),
                    level,
                })
            }
            _ => Ok(()),
        }
    }
}

fn missing_player(id: PlayerId) -> MembershipError {
    MembershipError::NotFound {
        entity: EntityKind::Player,
        id: id.to_string(),
    }
}
