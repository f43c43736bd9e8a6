//! Leaving a clan and removing members.

use std::cmp::Reverse;

use super::{
    Actor, MembershipError, MembershipTransition, PolicyEnv, check_clan, require_active,
    require_delegate, require_not_owner, require_player, require_rank,
};
use crate::cooldown::CooldownKind;
use crate::state::{ClanState, PlayerId};

/// A member removes another member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteAction {
    pub player: PlayerId,
    pub actor: Actor,
}

impl DeleteAction {
    pub fn new(player: PlayerId, remover: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Delegate(remover),
        }
    }
}

/// A member leaves on their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaveAction {
    pub player: PlayerId,
    pub actor: Actor,
}

impl LeaveAction {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Player,
        }
    }
}

impl MembershipTransition for DeleteAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let remover = require_delegate(
            state,
            self.actor,
            self.player,
            "remove members",
            "use leave to exit a clan",
        )?;
        let target = require_active(state, self.player)?;
        require_not_owner(state, self.player)?;

        let rules = env.policy.rules();
        let required = rules
            .min_level_to_remove_member
            .max(target.saturating_add(rules.min_level_offset_to_remove_member));
        require_rank(state, remover, "remove members", required)?;
        Ok(())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let remover = self.actor.resolve(self.player);
        release(state, self.player, remover, env)
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[])
    }
}

impl MembershipTransition for LeaveAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, _env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        require_player(
            state,
            self.actor,
            self.player,
            "leave",
            "members can only remove themselves by leaving",
        )?;
        require_active(state, self.player).map(|_| ())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        release(state, self.player, self.player, env)?;
        if state.is_owner(self.player) {
            hand_over(state, self.player, env)?;
        }
        Ok(())
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        if state.dissolved {
            if state.clan.membership_count != 0 {
                return Err(MembershipError::InvariantViolated(
                    "dissolved clan still has members",
                ));
            }
            return Ok(());
        }
        check_clan(state, env, &[state.clan.owner_id])
    }
}

/// Soft-deletes the membership, lowers both counts and starts the delete cooldown.
fn release(
    state: &mut ClanState,
    player: PlayerId,
    by: PlayerId,
    env: &PolicyEnv<'_>,
) -> Result<(), MembershipError> {
    let clan = state.clan.id;
    let membership = state
        .membership_mut(player)
        .ok_or(MembershipError::InvariantViolated("removed membership is missing"))?;
    membership.soft_delete(by, env.now);

    state.clan.membership_count = state.clan.membership_count.saturating_sub(1);
    let target = state.player_mut(player)?;
    target.membership_count = target.membership_count.saturating_sub(1);
    state
        .cooldowns
        .record(player, clan, CooldownKind::Delete, env.now);
    Ok(())
}

/// Passes ownership from a departing owner to the strongest remaining member.
///
/// Highest level wins, then the earliest approval, then the lowest id. With no
/// member left the clan is marked dissolved.
fn hand_over(
    state: &mut ClanState,
    former: PlayerId,
    env: &PolicyEnv<'_>,
) -> Result<(), MembershipError> {
    let departing = state.player_mut(former)?;
    departing.ownership_count = departing.ownership_count.saturating_sub(1);

    let successor = state
        .active_members()
        .max_by_key(|m| (m.level, Reverse(m.approved_at), Reverse(m.player_id)))
        .map(|m| m.player_id);

    let Some(successor) = successor else {
        state.dissolved = true;
        return Ok(());
    };

    let owner_level = env.policy.owner_level().rank;
    if let Some(membership) = state.membership_mut(successor) {
        membership.level = owner_level;
    }
    state.player_mut(successor)?.ownership_count += 1;
    state.clan.owner_id = successor;
    state.clan.updated_at = env.now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MembershipStatus, Timestamp};
    use crate::transition::ApplyAction;
    use crate::transition::fixtures::{HOUR_MS, OWNER, add_member, clan_state, run};

    #[test]
    fn delete_requires_offset_and_minimum_rank() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(2), 2, Timestamp(0));
        add_member(&mut state, PlayerId(3), 2, Timestamp(0));

        let err = run(
            &DeleteAction::new(PlayerId(3), PlayerId(2)),
            &mut state,
            Timestamp(1),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MembershipError::InsufficientRank {
                required: 3,
                actual: Some(2),
                ..
            }
        ));

        run(&DeleteAction::new(PlayerId(3), OWNER), &mut state, Timestamp(1)).unwrap();
        let membership = state.membership(PlayerId(3)).unwrap();
        assert_eq!(membership.status(), MembershipStatus::Deleted);
        assert_eq!(membership.deleted_by, Some(OWNER));
        assert_eq!(state.clan.membership_count, 2);
        assert_eq!(state.players[&PlayerId(3)].membership_count, 0);
    }

    #[test]
    fn owner_cannot_be_deleted() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(2), 3, Timestamp(0));
        assert!(matches!(
            run(&DeleteAction::new(OWNER, PlayerId(2)), &mut state, Timestamp(1)),
            Err(MembershipError::OwnerProtected { .. })
        ));
    }

    #[test]
    fn leave_starts_delete_cooldown() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(2), 1, Timestamp(0));
        run(&LeaveAction::new(PlayerId(2)), &mut state, Timestamp(10)).unwrap();

        assert_eq!(state.membership(PlayerId(2)).unwrap().deleted_by, Some(PlayerId(2)));
        assert!(matches!(
            run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(20)),
            Err(MembershipError::CooldownActive {
                kind: CooldownKind::Delete,
                ..
            })
        ));
        run(
            &ApplyAction::new(PlayerId(2), None),
            &mut state,
            Timestamp(10 + HOUR_MS),
        )
        .unwrap();
    }

    #[test]
    fn leave_by_delegate_is_rejected() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(2), 1, Timestamp(0));
        let err = run(
            &LeaveAction {
                player: PlayerId(2),
                actor: Actor::Delegate(OWNER),
            },
            &mut state,
            Timestamp(1),
        )
        .unwrap_err();
        assert!(matches!(err, MembershipError::ActorNotPermitted { .. }));
    }

    #[test]
    fn departing_owner_hands_clan_to_senior_member() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(2), 2, Timestamp(5));
        add_member(&mut state, PlayerId(3), 2, Timestamp(3));

        run(&LeaveAction::new(OWNER), &mut state, Timestamp(10)).unwrap();

        assert_eq!(state.clan.owner_id, PlayerId(3));
        assert_eq!(state.active_rank(PlayerId(3)), Some(4));
        assert_eq!(state.players[&PlayerId(3)].ownership_count, 1);
        assert_eq!(state.players[&OWNER].ownership_count, 0);
        assert_eq!(state.clan.membership_count, 2);
        assert!(!state.dissolved);
    }

    #[test]
    fn last_member_leaving_dissolves_clan() {
        let mut state = clan_state();
        run(&LeaveAction::new(OWNER), &mut state, Timestamp(10)).unwrap();
        assert!(state.dissolved);
        assert_eq!(state.clan.membership_count, 0);
        assert_eq!(state.players[&OWNER].membership_count, 0);
    }
}
