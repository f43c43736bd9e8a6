use super::{
    Actor, MembershipError, MembershipTransition, PolicyEnv, check_clan, require_active,
    require_delegate,
};
use crate::state::{ClanState, PlayerId};

/// The owner hands the clan to another active member.
///
/// The new owner moves to the top of the ladder; the previous owner lands on
/// the game's owner-demotion level (penultimate rank unless configured).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferOwnershipAction {
    /// The new owner.
    pub player: PlayerId,
    pub actor: Actor,
}

impl TransferOwnershipAction {
    pub fn new(new_owner: PlayerId, owner: PlayerId) -> Self {
        Self {
            player: new_owner,
            actor: Actor::Delegate(owner),
        }
    }
}

impl MembershipTransition for TransferOwnershipAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, _env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let owner = require_delegate(
            state,
            self.actor,
            self.player,
            "transfer ownership",
            "the clan can only be handed to someone else",
        )?;
        if !state.is_owner(owner) {
            return Err(MembershipError::ActorNotPermitted {
                actor: state.public_id_of(owner),
                action: "transfer ownership",
                reason: "only the clan owner can transfer ownership",
            });
        }
        require_active(state, self.player).map(|_| ())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let previous = state.clan.owner_id;
        let owner_level = env.policy.owner_level().rank;
        let former_level = env.policy.former_owner_level().rank;

        for (player, level) in [(self.player, owner_level), (previous, former_level)] {
            let membership = state
                .membership_mut(player)
                .ok_or(MembershipError::InvariantViolated("transfer party has no membership"))?;
            membership.level = level;
        }

        let departing = state.player_mut(previous)?;
        departing.ownership_count = departing.ownership_count.saturating_sub(1);
        state.player_mut(self.player)?.ownership_count += 1;

        state.clan.owner_id = self.player;
        state.clan.updated_at = env.now;
        Ok(())
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player, self.actor.resolve(self.player)])?;
        if state.active_rank(state.clan.owner_id) != Some(env.policy.owner_level().rank) {
            return Err(MembershipError::InvariantViolated(
                "clan owner must hold the top level",
            ));
        }
        Ok(())
    }
}
