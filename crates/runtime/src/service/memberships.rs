use clan_core::{
    ApplyAction, ApproveAction, ClanEngine, ClanState, DeleteAction, DemoteAction, DenyAction,
    Game, GamePolicy, InviteAction, LeaveAction, MembershipAction, PlayerId, PolicyEnv,
    PromoteAction, PublicId, StateDelta, TransferOwnershipAction,
};
use serde_json::Value;
use tracing::{debug, info};

use super::{ClanService, Notice, load_clan_state, require_clan, require_game, require_player};
use crate::error::Result;
use crate::events::HookEventKind;
use crate::events::payload::{
    MembershipPayload, clan_snapshot, ownership_payload, player_snapshot,
};
use crate::repository::EntityStore;

/// Outcome of a committed membership transition.
struct Executed {
    game: Game,
    policy: GamePolicy,
    /// Ids of the players passed in, in the same order.
    players: Vec<PlayerId>,
    /// Clan owner before the transition.
    previous_owner: PlayerId,
    state: ClanState,
    delta: StateDelta,
}

impl Executed {
    fn player(&self, index: usize) -> PlayerId {
        self.players[index]
    }

    fn snapshot(&self, player: PlayerId) -> Value {
        self.state
            .players
            .get(&player)
            .map_or(Value::Null, player_snapshot)
    }

    fn clan_snapshot(&self) -> Value {
        clan_snapshot(
            &self.state.clan,
            &self.state.public_id_of(self.state.clan.owner_id),
        )
    }

    fn level_name(&self, player: PlayerId) -> Option<String> {
        let level = self.state.membership(player)?.level;
        self.policy.ladder().name_of(level).map(str::to_string)
    }

    /// Payload for events about `target`, performed by `requestor`.
    fn membership_notice(
        &self,
        kind: HookEventKind,
        target: PlayerId,
        requestor: PlayerId,
        with_creator: bool,
    ) -> Notice {
        let membership = self.state.membership(target);
        let payload = MembershipPayload {
            clan: self.clan_snapshot(),
            player: self.snapshot(target),
            level: self.level_name(target),
            requestor: self.snapshot(requestor),
            creator: with_creator
                .then(|| membership.map(|m| self.snapshot(m.requestor_id)))
                .flatten(),
            message: membership.and_then(|m| m.message.clone()),
        };
        Notice::new(kind, payload.into_value(&self.game.public_id))
    }
}

impl<S: EntityStore> ClanService<S> {
    /// Runs one membership action in its own transaction.
    ///
    /// `players` are resolved by public id in order, and `build` receives their
    /// internal ids to assemble the action.
    fn execute<F>(
        &self,
        game: &PublicId,
        clan: &PublicId,
        players: &[&PublicId],
        build: F,
    ) -> Result<Executed>
    where
        F: FnOnce(&[PlayerId]) -> MembershipAction,
    {
        let now = self.clock.now();
        let executed = self.store.transaction(|tx| -> Result<Executed> {
            let game = require_game(tx, game)?;
            let policy = game.policy()?;
            let clan = require_clan(tx, game.id, clan)?;

            let mut involved = Vec::with_capacity(players.len());
            for public_id in players {
                involved.push(require_player(tx, game.id, public_id)?);
            }
            let ids: Vec<PlayerId> = involved.iter().map(|player| player.id).collect();

            let mut state = load_clan_state(tx, clan, &involved)?;
            let previous_owner = state.clan.owner_id;
            let action = build(&ids);
            let delta = ClanEngine::new(&mut state)
                .execute(PolicyEnv::new(&policy, now), &action)
                .inspect_err(|error| debug!("Membership action rejected: {}", error))?;
            tx.apply_delta(&delta)?;

            Ok(Executed {
                game,
                policy,
                players: ids,
                previous_owner,
                state,
                delta,
            })
        })?;

        info!(
            "Membership {} committed: game={}, clan={}, changed memberships={}",
            executed.delta.action,
            game,
            clan,
            executed.delta.memberships.len()
        );
        Ok(executed)
    }

    fn finish(&self, executed: Executed, notices: Vec<Notice>) -> StateDelta {
        self.publish(&executed.game.public_id, notices);
        executed.delta
    }

    /// Player asks to join the clan.
    ///
    /// With auto-join enabled the application is approved immediately and both
    /// the creation and the approval are notified.
    pub fn apply(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        message: Option<String>,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player], |ids| {
            ApplyAction::new(ids[0], message).into()
        })?;

        let target = executed.player(0);
        let mut notices = vec![executed.membership_notice(
            HookEventKind::ApplicationCreated,
            target,
            target,
            false,
        )];
        if executed.state.active_rank(target).is_some() {
            notices.push(executed.membership_notice(
                HookEventKind::ApplicationApproved,
                target,
                executed.state.clan.owner_id,
                true,
            ));
        }
        Ok(self.finish(executed, notices))
    }

    /// A member invites a player into the clan.
    pub fn invite(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        inviter: &PublicId,
        message: Option<String>,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, inviter], |ids| {
            InviteAction::new(ids[0], ids[1], message).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::InvitationCreated,
            executed.player(0),
            executed.player(1),
            false,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    pub fn approve_application(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        approver: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, approver], |ids| {
            ApproveAction::application(ids[0], ids[1]).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::ApplicationApproved,
            executed.player(0),
            executed.player(1),
            true,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    pub fn deny_application(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        denier: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, denier], |ids| {
            DenyAction::application(ids[0], ids[1]).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::ApplicationDenied,
            executed.player(0),
            executed.player(1),
            true,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    /// The invited player accepts.
    pub fn approve_invitation(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player], |ids| {
            ApproveAction::invitation(ids[0]).into()
        })?;
        let target = executed.player(0);
        let notice =
            executed.membership_notice(HookEventKind::InvitationApproved, target, target, true);
        Ok(self.finish(executed, vec![notice]))
    }

    /// The invited player declines.
    pub fn deny_invitation(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player], |ids| {
            DenyAction::invitation(ids[0]).into()
        })?;
        let target = executed.player(0);
        let notice =
            executed.membership_notice(HookEventKind::InvitationDenied, target, target, true);
        Ok(self.finish(executed, vec![notice]))
    }

    pub fn promote(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        requestor: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, requestor], |ids| {
            PromoteAction::new(ids[0], ids[1]).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::MemberPromoted,
            executed.player(0),
            executed.player(1),
            false,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    pub fn demote(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        requestor: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, requestor], |ids| {
            DemoteAction::new(ids[0], ids[1]).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::MemberDemoted,
            executed.player(0),
            executed.player(1),
            false,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    /// A higher-ranked member removes `player` from the clan.
    pub fn delete_member(
        &self,
        game: &PublicId,
        clan: &PublicId,
        player: &PublicId,
        requestor: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player, requestor], |ids| {
            DeleteAction::new(ids[0], ids[1]).into()
        })?;
        let notice = executed.membership_notice(
            HookEventKind::MemberDeleted,
            executed.player(0),
            executed.player(1),
            false,
        );
        Ok(self.finish(executed, vec![notice]))
    }

    /// The player leaves the clan.
    ///
    /// When the owner leaves, a `clan_left` event names the successor, or
    /// reports the clan as deleted when nobody was left to take over.
    pub fn leave(&self, game: &PublicId, clan: &PublicId, player: &PublicId) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[player], |ids| LeaveAction::new(ids[0]).into())?;

        let leaver = executed.player(0);
        let notice = if executed.previous_owner == leaver {
            ownership_notice(&executed, leaver, executed.state.clan.owner_id)
        } else {
            executed.membership_notice(HookEventKind::MemberLeft, leaver, leaver, false)
        };
        Ok(self.finish(executed, vec![notice]))
    }

    /// The owner hands the clan to another active member.
    pub fn transfer_ownership(
        &self,
        game: &PublicId,
        clan: &PublicId,
        owner: &PublicId,
        new_owner: &PublicId,
    ) -> Result<StateDelta> {
        let executed = self.execute(game, clan, &[new_owner, owner], |ids| {
            TransferOwnershipAction::new(ids[0], ids[1]).into()
        })?;
        let payload = ownership_payload(
            &executed.game.public_id,
            executed.clan_snapshot(),
            executed.snapshot(executed.player(1)),
            Some(executed.snapshot(executed.player(0))),
            false,
        );
        let notice = Notice::new(HookEventKind::OwnershipTransferred, payload);
        Ok(self.finish(executed, vec![notice]))
    }
}

fn ownership_notice(executed: &Executed, previous: PlayerId, current: PlayerId) -> Notice {
    let dissolved = executed.state.dissolved;
    let payload = ownership_payload(
        &executed.game.public_id,
        executed.clan_snapshot(),
        executed.snapshot(previous),
        (!dissolved).then(|| executed.snapshot(current)),
        dissolved,
    );
    Notice::new(HookEventKind::ClanLeft, payload)
}
