//! Answers to pending requests.
//!
//! Applications are reviewed by a sufficiently ranked member; invitations are
//! answered by the invited player only.

use super::admission::{admit, check_capacity};
use super::{
    Actor, MembershipError, MembershipTransition, PolicyEnv, check_clan, require_delegate,
    require_player, require_rank,
};
use crate::cooldown::CooldownKind;
use crate::error::EntityKind;
use crate::state::{ClanState, PlayerId, RequestKind};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApproveAction {
    pub player: PlayerId,
    pub actor: Actor,
    /// Kind of request being answered.
    pub request: RequestKind,
}

impl ApproveAction {
    /// A member accepts the player's application.
    pub fn application(player: PlayerId, approver: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Delegate(approver),
            request: RequestKind::Application,
        }
    }

    /// The player accepts their own invitation.
    pub fn invitation(player: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Player,
            request: RequestKind::Invitation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenyAction {
    pub player: PlayerId,
    pub actor: Actor,
    pub request: RequestKind,
}

impl DenyAction {
    pub fn application(player: PlayerId, denier: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Delegate(denier),
            request: RequestKind::Application,
        }
    }

    pub fn invitation(player: PlayerId) -> Self {
        Self {
            player,
            actor: Actor::Player,
            request: RequestKind::Invitation,
        }
    }
}

impl MembershipTransition for ApproveAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        authorize(state, env, self.player, self.actor, self.request, Verdict::Approve)?;
        check_capacity(state, self.player, env)
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        admit(state, self.player, self.actor.resolve(self.player), env)
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[self.player])
    }
}

impl MembershipTransition for DenyAction {
    type Error = MembershipError;

    fn pre_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        authorize(state, env, self.player, self.actor, self.request, Verdict::Deny)
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        let denier = self.actor.resolve(self.player);
        let clan = state.clan.id;
        let membership = state
            .membership_mut(self.player)
            .ok_or(MembershipError::InvariantViolated("denied membership is missing"))?;
        membership.deny(denier, env.now);
        state
            .cooldowns
            .record(self.player, clan, CooldownKind::Deny, env.now);
        Ok(())
    }

    fn post_validate(&self, state: &ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        check_clan(state, env, &[])
    }
}

#[derive(Clone, Copy)]
enum Verdict {
    Approve,
    Deny,
}

impl Verdict {
    fn verb(self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Deny => "deny",
        }
    }

    fn rank_action(self) -> &'static str {
        match self {
            Verdict::Approve => "approve applications",
            Verdict::Deny => "deny applications",
        }
    }
}

/// Shared approve/deny checks: a matching pending request and an allowed actor.
fn authorize(
    state: &ClanState,
    env: &PolicyEnv<'_>,
    player: PlayerId,
    actor: Actor,
    request: RequestKind,
    verdict: Verdict,
) -> Result<(), MembershipError> {
    let membership = state
        .membership(player)
        .ok_or_else(|| MembershipError::NotFound {
            entity: EntityKind::Membership,
            id: format!("{}/{}", state.clan.public_id, state.public_id_of(player)),
        })?;

    if !membership.is_pending() || membership.request_kind() != request {
        return Err(MembershipError::NoPendingRequest {
            player: state.public_id_of(player),
            clan: state.clan.public_id.clone(),
        });
    }

    match request {
        RequestKind::Invitation => require_player(
            state,
            actor,
            player,
            verdict.verb(),
            "only the invited player can answer an invitation",
        ),
        RequestKind::Application => {
            let reviewer = require_delegate(
                state,
                actor,
                player,
                verdict.verb(),
                "applications are reviewed by clan members",
            )?;
            require_rank(
                state,
                reviewer,
                verdict.rank_action(),
                env.policy.rules().min_level_to_accept_application,
            )
            .map(|_| ())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MembershipStatus, Timestamp};
    use crate::transition::fixtures::{HOUR_MS, OWNER, add_member, clan_state, run};
    use crate::transition::{ApplyAction, InviteAction};

    #[test]
    fn owner_approves_application_at_entry_level() {
        let mut state = clan_state();
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(1)).unwrap();
        run(
            &ApproveAction::application(PlayerId(2), OWNER),
            &mut state,
            Timestamp(2),
        )
        .unwrap();

        let membership = state.membership(PlayerId(2)).unwrap();
        assert!(membership.is_active());
        assert_eq!(membership.level, 1);
        assert_eq!(membership.approver_id, Some(OWNER));
        assert_eq!(membership.approved_at, Some(Timestamp(2)));
        assert_eq!(state.clan.membership_count, 2);
        assert_eq!(state.players[&PlayerId(2)].membership_count, 1);
    }

    #[test]
    fn applicant_cannot_approve_own_application() {
        let mut state = clan_state();
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(1)).unwrap();
        let err = run(
            &ApproveAction {
                player: PlayerId(2),
                actor: Actor::Player,
                request: RequestKind::Application,
            },
            &mut state,
            Timestamp(2),
        )
        .unwrap_err();
        assert!(matches!(err, MembershipError::ActorNotPermitted { .. }));
    }

    #[test]
    fn only_invited_player_answers_invitation() {
        let mut state = clan_state();
        run(
            &InviteAction::new(PlayerId(2), OWNER, None),
            &mut state,
            Timestamp(1),
        )
        .unwrap();

        let err = run(
            &ApproveAction {
                player: PlayerId(2),
                actor: Actor::Delegate(OWNER),
                request: RequestKind::Invitation,
            },
            &mut state,
            Timestamp(2),
        )
        .unwrap_err();
        assert!(matches!(err, MembershipError::ActorNotPermitted { .. }));

        run(&ApproveAction::invitation(PlayerId(2)), &mut state, Timestamp(3)).unwrap();
        let membership = state.membership(PlayerId(2)).unwrap();
        assert_eq!(membership.approver_id, Some(PlayerId(2)));
        assert_eq!(membership.requestor_id, OWNER);
    }

    #[test]
    fn request_kind_must_match() {
        let mut state = clan_state();
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(1)).unwrap();
        assert!(matches!(
            run(&ApproveAction::invitation(PlayerId(2)), &mut state, Timestamp(2)),
            Err(MembershipError::NoPendingRequest { .. })
        ));
        assert!(matches!(
            run(&DenyAction::invitation(PlayerId(3)), &mut state, Timestamp(2)),
            Err(MembershipError::NotFound {
                entity: EntityKind::Membership,
                ..
            })
        ));
    }

    #[test]
    fn low_ranked_member_cannot_review() {
        let mut state = clan_state();
        add_member(&mut state, PlayerId(3), 1, Timestamp(0));
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(1)).unwrap();

        let err = run(
            &DenyAction::application(PlayerId(2), PlayerId(3)),
            &mut state,
            Timestamp(2),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            MembershipError::InsufficientRank {
                action: "deny applications",
                required: 2,
                actual: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn deny_starts_cooldown_and_allows_reapply_after_window() {
        let mut state = clan_state();
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(0)).unwrap();
        run(
            &DenyAction::application(PlayerId(2), OWNER),
            &mut state,
            Timestamp(0),
        )
        .unwrap();
        assert_eq!(
            state.membership(PlayerId(2)).unwrap().status(),
            MembershipStatus::Denied
        );

        assert!(matches!(
            run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(HOUR_MS)),
            Err(MembershipError::CooldownActive {
                kind: CooldownKind::Deny,
                ..
            })
        ));
        run(
            &ApplyAction::new(PlayerId(2), None),
            &mut state,
            Timestamp(25 * HOUR_MS),
        )
        .unwrap();
        assert!(state.membership(PlayerId(2)).unwrap().is_pending());
    }

    #[test]
    fn approval_rechecks_capacity() {
        let mut state = clan_state();
        run(&ApplyAction::new(PlayerId(2), None), &mut state, Timestamp(1)).unwrap();
        add_member(&mut state, PlayerId(3), 1, Timestamp(1));
        add_member(&mut state, PlayerId(4), 1, Timestamp(1));

        assert!(matches!(
            run(
                &ApproveAction::application(PlayerId(2), OWNER),
                &mut state,
                Timestamp(2)
            ),
            Err(MembershipError::ClanFull { .. })
        ));
    }
}
