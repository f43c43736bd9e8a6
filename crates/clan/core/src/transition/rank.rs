//! One-step moves along the ladder.
//!
//! Promotion may land on the top rank; only a move past either end of the
//! ladder fails. Reaching the top rank does not make a member the owner:
//! ownership only changes hands through a transfer or succession.

use super::{
    Actor, MembershipError, MembershipTransition, PolicyEnv, check_clan, require_active,
    require_delegate, require_not_owner, require_rank,
};
use crate::state::{ClanState, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromoteAction {
    pub player: PlayerId,
    pub actor: Actor,
}

impl PromoteAction {
    pub fn new(player: PlayerId, promoter: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Delegate(promoter),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemoteAction {
    pub player: PlayerId,
    pub actor: Actor,
}

impl DemoteAction {
    pub fn new(player: PlayerId, demoter: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Delegate(demoter),
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Direction::Up => "promote",
            Direction::Down => "demote",
        }
    }

    fn rank_action(self) -> &'static str {
        match self {
            Direction::Up => "promote members",
            Direction::Down => "demote members",
        }
    }

    fn offset(self, env: &PolicyEnv<'_>) -> i64 {
        let rules = env.policy.rules();
        match self {
            Direction::Up => rules.min_level_offset_to_promote_member,
            Direction::Down => rules.min_level_offset_to_demote_member,
        }
    }

    /// Rank one step away in this direction, if it is reachable.
    fn target_rank(self, env: &PolicyEnv<'_>, rank: i64) -> Option<i64> {
        let ladder = env.policy.ladder();
        let level = match self {
            Direction::Up => ladder.next_above(rank),
            Direction::Down => ladder.next_below(rank),
        };
        level.map(|level| level.rank)
    }

    fn bound(self) -> &'static str {
        match self {
            Direction::Up => "top",
            Direction::Down => "bottom",
        }
    }
}

fn validate_move(
    state: &ClanState,
    env: &PolicyEnv<'_>,
    player: PlayerId,
    actor: Actor,
    direction: Direction,
) -> Result<i64, MembershipError> {
    let verb = direction.verb();
    let mover = require_delegate(
        state,
        actor,
        player,
        verb,
        "members cannot change their own level",
    )?;
    let current = require_active(state, player)?;
    require_not_owner(state, player)?;
    state.check_level(player, env.policy)?;

    let target = direction
        .target_rank(env, current)
        .ok_or_else(|| MembershipError::LevelBoundary {
            player: state.public_id_of(player),
            level: current,
            bound: direction.bound(),
        })?;

    require_rank(
        state,
        mover,
        direction.rank_action(),
        current.saturating_add(direction.offset(env)),
    )?;
    Ok(target)
}

fn apply_move(
    state: &mut ClanState,
    env: &PolicyEnv<'_>,
    player: PlayerId,
    direction: Direction,
) -> Result<(), MembershipError> {
    let current = state
        .active_rank(player)
        .ok_or(MembershipError::InvariantViolated("moved membership is not active"))?;
    let next = direction
        .target_rank(env, current)
        .ok_or(MembershipError::InvariantViolated("level left the ladder"))?;
    if let Some(membership) = state.membership_mut(player) {
        membership.level = next;
    }
    Ok(())
}

impl MembershipTransition for PromoteAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        validate_move(state, env, self.player, self.actor, Direction::Up).map(|_| ())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        apply_move(state, env, self.player, Direction::Up)
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player])
    }
}

impl MembershipTransition for DemoteAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        validate_move(state, env, self.player, self.actor, Direction::Down).map(|_| ())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        apply_move(state, env, self.player, Direction::Down)
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player])
    }
}
