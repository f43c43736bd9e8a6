//! Requests to join a clan: applications and invitations.

use std::collections::btree_map::Entry;

use super::{
    Actor, MembershipError, MembershipTransition, PolicyEnv, check_clan, require_delegate,
    require_player, require_rank,
};
use crate::state::{ClanState, Membership, PlayerId};

/// A player asks to join the clan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyAction {
    pub player: PlayerId,
    pub actor: Actor,
    pub message: Option<String>,
}

impl ApplyAction {
    pub fn new(player: PlayerId, message: Option<String>) -> Self {
        Self {
            player,
            actor: Actor::Player,
            message,
        }
    }
}

/// A member invites a player into the clan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteAction {
    pub player: PlayerId,
    pub actor: Actor,
    pub message: Option<String>,
}

impl InviteAction {
    pub fn new(player: PlayerId, inviter: PlayerId, message: Option<String>) -> Self {
        Self {
            player,
            actor: Actor::Delegate(inviter),
            message,
        }
    }
}

impl MembershipTransition for ApplyAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        require_player(
            state,
            self.actor,
            self.player,
            "apply",
            "applications are made by the player themself",
        )?;
        if !state.clan.allow_application {
            return Err(MembershipError::ApplicationsClosed {
                clan: state.clan.public_id.clone(),
            });
        }
        check_admission(state, self.player, env)
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        open_request(state, self.player, self.player, self.message.clone(), env);
        if state.clan.auto_join {
            let approver = state.clan.owner_id;
            admit(state, self.player, approver, env)?;
        }
        Ok(())
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player])
    }
}

impl MembershipTransition for InviteAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let inviter = require_delegate(
            state,
            self.actor,
            self.player,
            "invite",
            "players cannot invite themselves",
        )?;
        require_rank(
            state,
            inviter,
            "invite players",
            env.policy.rules().min_level_to_create_invitation,
        )?;
        check_admission(state, self.player, env)
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let inviter = self.actor.resolve(self.player);
        open_request(state, self.player, inviter, self.message.clone(), env);
        Ok(())
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player])
    }
}

/// Checks shared by every new request: cooldown, duplicates and capacity.
fn check_admission(
    state: &ClanState,
    player: PlayerId,
    env: &PolicyEnv<'_>,
) -> Result<(), MembershipError> {
    state.player(player)?;

    if let Some((kind, remaining)) =
        state
            .cooldowns
            .remaining(player, state.clan.id, env.now, env.policy.rules())
    {
        return Err(MembershipError::CooldownActive {
            player: state.public_id_of(player),
            clan: state.clan.public_id.clone(),
            kind,
            remaining,
        });
    }

    if let Some(existing) = state
        .membership(player)
        .filter(|membership| membership.is_active() || membership.is_pending())
    {
        return Err(MembershipError::AlreadyMember {
            player: state.public_id_of(player),
            clan: state.clan.public_id.clone(),
            status: existing.status(),
        });
    }

    check_capacity(state, player, env)
}

/// Fails if the clan or the player has no room for one more membership.
pub(super) fn check_capacity(
    state: &ClanState,
    player: PlayerId,
    env: &PolicyEnv<'_>,
) -> Result<(), MembershipError> {
    let rules = env.policy.rules();
    if state.clan.membership_count >= rules.max_members {
        return Err(MembershipError::ClanFull {
            clan: state.clan.public_id.clone(),
            max_members: rules.max_members,
        });
    }

    let target = state.player(player)?;
    if target.membership_count >= rules.max_clans_per_player {
        return Err(MembershipError::TooManyClans {
            player: target.public_id.clone(),
            max_clans: rules.max_clans_per_player,
        });
    }
    Ok(())
}

/// Creates the pending record, or reopens a denied or deleted one.
fn open_request(
    state: &mut ClanState,
    player: PlayerId,
    requestor: PlayerId,
    message: Option<String>,
    env: &PolicyEnv<'_>,
) {
    let level = env.policy.entry_level().rank;
    match state.memberships.entry(player) {
        Entry::Occupied(mut slot) => slot.get_mut().reopen(requestor, level, message, env.now),
        Entry::Vacant(slot) => {
            slot.insert(Membership::request(
                &state.clan,
                player,
                requestor,
                level,
                message,
                env.now,
            ));
        }
    }
}

/// Approves a pending record and bumps both member counts.
pub(super) fn admit(
    state: &mut ClanState,
    player: PlayerId,
    approver: PlayerId,
    env: &PolicyEnv<'_>,
) -> Result<(), MembershipError> {
    if !state.membership(player).is_some_and(|m| m.is_pending()) {
        return Err(MembershipError::NoPendingRequest {
            player: state.public_id_of(player),
            clan: state.clan.public_id.clone(),
        });
    }

    let level = env.policy.entry_level().rank;
    if let Some(membership) = state.membership_mut(player) {
        membership.approve(approver, level, env.now);
    }

    state.clan.membership_count += 1;
    state.player_mut(player)?.membership_count += 1;
    Ok(())
}
