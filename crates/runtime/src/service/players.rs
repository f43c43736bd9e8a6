use clan_core::{
    Metadata, MembershipStatus, Player, PlayerId, PublicId, RequestKind, Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ClanService, Notice, require_game, require_player};
use crate::error::Result;
use crate::events::HookEventKind;
use crate::events::payload::{player_snapshot, with_game};
use crate::repository::{EntityStore, Table};

/// Caller-supplied fields of a new player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub public_id: PublicId,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A player together with every membership record they appear in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDetails {
    pub player: Player,
    pub memberships: Vec<PlayerMembership>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMembership {
    pub clan: PublicId,
    pub clan_name: String,
    pub owner: bool,
    pub status: MembershipStatus,
    pub request: RequestKind,
    /// Level name, or the raw rank when the ladder no longer has it.
    pub level: String,
    pub requested_at: Timestamp,
    pub approved_at: Option<Timestamp>,
}

impl<S: EntityStore> ClanService<S> {
    pub fn create_player(&self, game: &PublicId, new: NewPlayer) -> Result<Player> {
        let now = self.clock.now();
        let player = self.store.transaction(|tx| -> Result<Player> {
            let game = require_game(tx, game)?;
            let id = PlayerId(tx.next_id(Table::Players)?);
            let player = Player::new(id, game.id, new.public_id, new.name, new.metadata, now);
            tx.insert_player(&player)?;
            Ok(player)
        })?;

        info!("Player {} created in game {}", player.public_id, game);
        self.publish(
            game,
            vec![Notice::new(
                HookEventKind::PlayerCreated,
                with_game(game, player_snapshot(&player)),
            )],
        );
        Ok(player)
    }

    /// Replaces the player's name and metadata.
    pub fn update_player(
        &self,
        game: &PublicId,
        public_id: &PublicId,
        name: String,
        metadata: Metadata,
    ) -> Result<Player> {
        let now = self.clock.now();
        let player = self.store.transaction(|tx| -> Result<Player> {
            let game = require_game(tx, game)?;
            let mut player = require_player(tx, game.id, public_id)?;
            player.name = name;
            player.metadata = metadata;
            player.updated_at = now;
            tx.update_player(&player)?;
            Ok(player)
        })?;

        info!("Player {} updated in game {}", player.public_id, game);
        self.publish(
            game,
            vec![Notice::new(
                HookEventKind::PlayerUpdated,
                with_game(game, player_snapshot(&player)),
            )],
        );
        Ok(player)
    }

    pub fn get_player(&self, game: &PublicId, public_id: &PublicId) -> Result<PlayerDetails> {
        self.store.transaction(|tx| -> Result<PlayerDetails> {
            let game = require_game(tx, game)?;
            let ladder = game.ladder()?;
            let player = require_player(tx, game.id, public_id)?;

            let mut memberships = Vec::new();
            for membership in tx.player_memberships(player.id)? {
                let Some(clan) = tx.clan(membership.clan_id)? else {
                    continue;
                };
                memberships.push(PlayerMembership {
                    clan: clan.public_id,
                    clan_name: clan.name,
                    owner: clan.owner_id == player.id,
                    status: membership.status(),
                    request: membership.request_kind(),
                    level: ladder
                        .name_of(membership.level)
                        .map_or_else(|| membership.level.to_string(), str::to_string),
                    requested_at: membership.requested_at,
                    approved_at: membership.approved_at,
                });
            }

            Ok(PlayerDetails {
                player,
                memberships,
            })
        })
    }
}
