use clan_core::{
    Clan, ClanCharter, ClanId, EntityKind, Membership, MembershipError, Metadata, PolicyEnv,
    PublicId, RequestKind, StateDelta, Timestamp, found_clan,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ClanService, Notice, not_found, require_clan, require_game, require_player};
use crate::error::Result;
use crate::events::HookEventKind;
use crate::events::payload::{clan_snapshot, with_game};
use crate::repository::{EntityStore, StoreTx, Table};

/// Owner-editable clan fields. `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanUpdate {
    pub name: Option<String>,
    pub metadata: Option<Metadata>,
    pub allow_application: Option<bool>,
    pub auto_join: Option<bool>,
}

/// A clan with its roster and open requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanDetails {
    pub clan: Clan,
    pub owner: PublicId,
    pub members: Vec<RosterEntry>,
    pub pending_applications: Vec<RosterEntry>,
    pub pending_invitations: Vec<RosterEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub player: PublicId,
    pub name: String,
    pub level: i64,
    pub level_name: Option<String>,
    pub requestor: PublicId,
    pub message: Option<String>,
    pub requested_at: Timestamp,
    pub approved_at: Option<Timestamp>,
}

fn public_id(tx: &dyn StoreTx, player: clan_core::PlayerId) -> Result<PublicId> {
    Ok(tx
        .player(player)?
        .map(|p| p.public_id)
        .ok_or_else(|| not_found(EntityKind::Player, player))?)
}

impl<S: EntityStore> ClanService<S> {
    /// Creates a clan owned by `owner`, who joins it at the top level.
    pub fn create_clan(
        &self,
        game: &PublicId,
        owner: &PublicId,
        charter: ClanCharter,
    ) -> Result<Clan> {
        let now = self.clock.now();
        let clan = self.store.transaction(|tx| -> Result<Clan> {
            let game = require_game(tx, game)?;
            let policy = game.policy()?;
            let owner = require_player(tx, game.id, owner)?;

            let id = ClanId(tx.next_id(Table::Clans)?);
            let state = found_clan(id, charter, owner, &PolicyEnv::new(&policy, now))?;
            tx.apply_delta(&StateDelta::founded(&state, now))?;
            Ok(state.clan)
        })?;

        info!("Clan {} created in game {} by {}", clan.public_id, game, owner);
        self.publish(
            game,
            vec![Notice::new(
                HookEventKind::ClanCreated,
                with_game(game, clan_snapshot(&clan, owner)),
            )],
        );
        Ok(clan)
    }

    /// Updates name, metadata and admission flags. Only the owner may do this.
    pub fn update_clan(
        &self,
        game: &PublicId,
        clan: &PublicId,
        actor: &PublicId,
        update: ClanUpdate,
    ) -> Result<Clan> {
        let now = self.clock.now();
        let clan = self.store.transaction(|tx| -> Result<Clan> {
            let game = require_game(tx, game)?;
            let mut clan = require_clan(tx, game.id, clan)?;
            let actor = require_player(tx, game.id, actor)?;
            if clan.owner_id != actor.id {
                return Err(MembershipError::ActorNotPermitted {
                    actor: actor.public_id,
                    action: "update clan",
                    reason: "only the clan owner may change it",
                }
                .into());
            }

            if let Some(name) = update.name {
                clan.name = name;
            }
            if let Some(metadata) = update.metadata {
                clan.metadata = metadata;
            }
            if let Some(allow) = update.allow_application {
                clan.allow_application = allow;
            }
            if let Some(auto_join) = update.auto_join {
                clan.auto_join = auto_join;
            }
            clan.updated_at = now;
            tx.update_clan(&clan)?;
            Ok(clan)
        })?;

        info!("Clan {} updated in game {}", clan.public_id, game);
        self.publish(
            game,
            vec![Notice::new(
                HookEventKind::ClanUpdated,
                with_game(game, clan_snapshot(&clan, actor)),
            )],
        );
        Ok(clan)
    }

    pub fn get_clan(&self, game: &PublicId, clan: &PublicId) -> Result<ClanDetails> {
        self.store.transaction(|tx| -> Result<ClanDetails> {
            let game = require_game(tx, game)?;
            let ladder = game.ladder()?;
            let clan = require_clan(tx, game.id, clan)?;

            let entry = |tx: &dyn StoreTx, membership: &Membership| -> Result<RosterEntry> {
                let player = tx
                    .player(membership.player_id)?
                    .ok_or_else(|| not_found(EntityKind::Player, membership.player_id))?;
                Ok(RosterEntry {
                    player: player.public_id,
                    name: player.name,
                    level: membership.level,
                    level_name: ladder.name_of(membership.level).map(str::to_string),
                    requestor: public_id(tx, membership.requestor_id)?,
                    message: membership.message.clone(),
                    requested_at: membership.requested_at,
                    approved_at: membership.approved_at,
                })
            };

            let mut details = ClanDetails {
                owner: public_id(tx, clan.owner_id)?,
                clan,
                members: Vec::new(),
                pending_applications: Vec::new(),
                pending_invitations: Vec::new(),
            };
            for membership in tx.clan_memberships(details.clan.id)? {
                if membership.is_active() {
                    details.members.push(entry(tx, &membership)?);
                } else if membership.is_pending() {
                    let pending = entry(tx, &membership)?;
                    match membership.request_kind() {
                        RequestKind::Application => details.pending_applications.push(pending),
                        RequestKind::Invitation => details.pending_invitations.push(pending),
                    }
                }
            }
            details
                .members
                .sort_by(|a, b| b.level.cmp(&a.level).then(a.approved_at.cmp(&b.approved_at)));
            Ok(details)
        })
    }

    pub fn list_clans(&self, game: &PublicId) -> Result<Vec<Clan>> {
        self.store.transaction(|tx| -> Result<Vec<Clan>> {
            let game = require_game(tx, game)?;
            Ok(tx.list_clans(game.id)?)
        })
    }

    /// Clans whose name contains `term`, ignoring case, up to the configured limit.
    pub fn search_clans(&self, game: &PublicId, term: &str) -> Result<Vec<Clan>> {
        let limit = self.config.search_limit;
        self.store.transaction(|tx| -> Result<Vec<Clan>> {
            let game = require_game(tx, game)?;
            Ok(tx.search_clans(game.id, term.trim(), limit)?)
        })
    }
}
