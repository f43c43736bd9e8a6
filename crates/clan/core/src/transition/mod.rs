//! Membership lifecycle transitions.
//!
//! Each lifecycle event is a small value type implementing
//! [`MembershipTransition`]. The engine drives it through
//! `pre_validate -> apply -> post_validate` against a [`ClanState`] snapshot.

mod admission;
mod error;
mod found;
mod ownership;
mod rank;
mod removal;
mod review;

use serde::{Deserialize, Serialize};

use crate::policy::GamePolicy;
use crate::state::{ClanState, PlayerId, Timestamp};

pub use admission::{ApplyAction, InviteAction};
pub use error::MembershipError;
pub use found::{ClanCharter, found_clan};
pub use ownership::TransferOwnershipAction;
pub use rank::{DemoteAction, PromoteAction};
pub use removal::{DeleteAction, LeaveAction};
pub use review::{ApproveAction, DenyAction};

/// Read-only facts every transition is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct PolicyEnv<'a> {
    pub policy: &'a GamePolicy,
    pub now: Timestamp,
}

impl<'a> PolicyEnv<'a> {
    pub fn new(policy: &'a GamePolicy, now: Timestamp) -> Self {
        Self { policy, now }
    }
}

/// Defines how a lifecycle event mutates a clan snapshot.
///
/// Validation hooks receive read-only access to the snapshot and must stay
/// side-effect free. `apply` may assume `pre_validate` succeeded.
pub trait MembershipTransition {
    type Error;

    /// Validates pre-conditions using the state **before** mutation.
    fn pre_validate(&self, _state: &ClanState, _env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn apply(&self, state: &mut ClanState, env: &PolicyEnv<'_>) -> Result<(), Self::Error>;

    /// Validates post-conditions using the state **after** mutation.
    fn post_validate(&self, _state: &ClanState, _env: &PolicyEnv<'_>) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Who performs an operation on a membership.
///
/// `Player` is the membership's own player acting for themself; `Delegate` is
/// another member of the clan acting on the player's membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    Player,
    Delegate(PlayerId),
}

impl Actor {
    /// Player id of whoever is acting, given the membership's player.
    pub fn resolve(self, player: PlayerId) -> PlayerId {
        match self {
            Actor::Player => player,
            Actor::Delegate(id) => id,
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, Actor::Player)
    }
}

/// Name of an executed operation, recorded on every delta.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Found,
    Apply,
    Invite,
    Approve,
    Deny,
    Promote,
    Demote,
    Delete,
    Leave,
    TransferOwnership,
}

/// A membership operation ready for the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipAction {
    Apply(ApplyAction),
    Invite(InviteAction),
    Approve(ApproveAction),
    Deny(DenyAction),
    Promote(PromoteAction),
    Demote(DemoteAction),
    Delete(DeleteAction),
    Leave(LeaveAction),
    TransferOwnership(TransferOwnershipAction),
}

impl MembershipAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Apply(_) => ActionKind::Apply,
            Self::Invite(_) => ActionKind::Invite,
            Self::Approve(_) => ActionKind::Approve,
            Self::Deny(_) => ActionKind::Deny,
            Self::Promote(_) => ActionKind::Promote,
            Self::Demote(_) => ActionKind::Demote,
            Self::Delete(_) => ActionKind::Delete,
            Self::Leave(_) => ActionKind::Leave,
            Self::TransferOwnership(_) => ActionKind::TransferOwnership,
        }
    }

    /// Player whose membership the action targets.
    pub fn player(&self) -> PlayerId {
        match self {
            Self::Apply(action) => action.player,
            Self::Invite(action) => action.player,
            Self::Approve(action) => action.player,
            Self::Deny(action) => action.player,
            Self::Promote(action) => action.player,
            Self::Demote(action) => action.player,
            Self::Delete(action) => action.player,
            Self::Leave(action) => action.player,
            Self::TransferOwnership(action) => action.player,
        }
    }
}

macro_rules! impl_from_action {
    ($($variant:ident($action:ty)),+ $(,)?) => {
        $(
            impl From<$action> for MembershipAction {
                fn from(action: $action) -> Self {
                    Self::$variant(action)
                }
            }
        )+
    };
}

impl_from_action!(
    Apply(ApplyAction),
    Invite(InviteAction),
    Approve(ApproveAction),
    Deny(DenyAction),
    Promote(PromoteAction),
    Demote(DemoteAction),
    Delete(DeleteAction),
    Leave(LeaveAction),
    TransferOwnership(TransferOwnershipAction),
);

/// Requires the player to act on their own membership.
fn require_player(
    state: &ClanState,
    actor: Actor,
    player: PlayerId,
    action: &'static str,
    reason: &'static str,
) -> Result<(), MembershipError> {
    match actor {
        Actor::Player => Ok(()),
        Actor::Delegate(id) if id == player => Ok(()),
        Actor::Delegate(id) => Err(MembershipError::ActorNotPermitted {
            actor: state.public_id_of(id),
            action,
            reason,
        }),
    }
}

/// Requires another member to act on the player's membership; returns their id.
fn require_delegate(
    state: &ClanState,
    actor: Actor,
    player: PlayerId,
    action: &'static str,
    reason: &'static str,
) -> Result<PlayerId, MembershipError> {
    match actor {
        Actor::Delegate(id) if id != player => Ok(id),
        _ => Err(MembershipError::ActorNotPermitted {
            actor: state.public_id_of(player),
            action,
            reason,
        }),
    }
}

/// Requires `actor` to be an active member at `required` or above.
fn require_rank(
    state: &ClanState,
    actor: PlayerId,
    action: &'static str,
    required: i64,
) -> Result<i64, MembershipError> {
    match state.active_rank(actor) {
        Some(rank) if rank >= required => Ok(rank),
        actual => Err(MembershipError::InsufficientRank {
            actor: state.public_id_of(actor),
            action,
            required,
            actual,
        }),
    }
}

/// The player's active rank, or `NotAMember`.
fn require_active(state: &ClanState, player: PlayerId) -> Result<i64, MembershipError> {
    state
        .active_rank(player)
        .ok_or_else(|| MembershipError::NotAMember {
            player: state.public_id_of(player),
            clan: state.clan.public_id.clone(),
        })
}

/// Rejects actions that target the clan owner.
fn require_not_owner(state: &ClanState, player: PlayerId) -> Result<(), MembershipError> {
    if state.is_owner(player) {
        return Err(MembershipError::OwnerProtected {
            clan: state.clan.public_id.clone(),
            owner: state.public_id_of(player),
        });
    }
    Ok(())
}

/// Post-condition shared by every transition.
fn check_clan(
    state: &ClanState,
    env: &PolicyEnv<'_>,
    touched: &[PlayerId],
) -> Result<(), MembershipError> {
    state.check_invariants()?;
    if state.clan.membership_count > env.policy.rules().max_members {
        return Err(MembershipError::InvariantViolated(
            "clan member count exceeds maxMembers",
        ));
    }
    for player in touched {
        state.check_level(*player, env.policy)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::Duration;

    use super::{MembershipError, MembershipTransition, PolicyEnv};
    use crate::ladder::Ladder;
    use crate::policy::{GamePolicy, MembershipRules, Metadata, OwnerDemotion};
    use crate::state::{
        Clan, ClanId, ClanState, GameId, Membership, Player, PlayerId, PublicId, Timestamp,
    };

    pub const OWNER: PlayerId = PlayerId(1);
    pub const HOUR_MS: i64 = 3_600_000;

    /// Ladder `{member:1, elder:2, coleader:3, leader:4}` with offset 1 everywhere.
    pub fn policy() -> GamePolicy {
        let ladder = Ladder::from_ranks([("member", 1), ("elder", 2), ("coleader", 3), ("leader", 4)])
            .expect("valid ladder");
        GamePolicy::new(
            ladder,
            MembershipRules {
                min_level_to_accept_application: 2,
                min_level_to_create_invitation: 2,
                min_level_to_remove_member: 2,
                min_level_offset_to_remove_member: 1,
                min_level_offset_to_promote_member: 1,
                min_level_offset_to_demote_member: 1,
                max_members: 3,
                max_clans_per_player: 1,
                cooldown_after_deny: Duration::from_secs(24 * 3_600),
                cooldown_after_delete: Duration::from_secs(3_600),
                owner_demotion: OwnerDemotion::Penultimate,
            },
        )
    }

    pub fn player(id: u64) -> Player {
        Player::new(
            PlayerId(id),
            GameId(1),
            PublicId::new(format!("player-{id}")),
            format!("Player {id}"),
            Metadata::new(),
            Timestamp::EPOCH,
        )
    }

    /// Clan owned by [`OWNER`] at level 4, plus unaffiliated players 2..=5.
    pub fn clan_state() -> ClanState {
        let clan = Clan {
            id: ClanId(10),
            game_id: GameId(1),
            public_id: PublicId::new("wolves"),
            name: "Wolves".into(),
            owner_id: OWNER,
            membership_count: 1,
            allow_application: true,
            auto_join: false,
            metadata: Metadata::new(),
            created_at: Timestamp::EPOCH,
            updated_at: Timestamp::EPOCH,
        };
        let mut owner = player(OWNER.0);
        owner.membership_count = 1;
        owner.ownership_count = 1;
        let mut membership = Membership::request(&clan, OWNER, OWNER, 4, None, Timestamp::EPOCH);
        membership.approve(OWNER, 4, Timestamp::EPOCH);

        (2..=5).fold(
            ClanState::new(clan)
                .with_player(owner)
                .with_membership(membership),
            |state, id| state.with_player(player(id)),
        )
    }

    /// Adds an active member at `level`, keeping the counts consistent.
    pub fn add_member(state: &mut ClanState, id: PlayerId, level: i64, approved_at: Timestamp) {
        let mut membership = Membership::request(&state.clan, id, id, level, None, approved_at);
        membership.approve(OWNER, level, approved_at);
        state.memberships.insert(id, membership);
        state.clan.membership_count += 1;
        if let Some(player) = state.players.get_mut(&id) {
            player.membership_count += 1;
        }
    }

    /// Drives one transition through all three phases against [`policy`].
    pub fn run<T>(action: &T, state: &mut ClanState, now: Timestamp) -> Result<(), MembershipError>
    where
        T: MembershipTransition<Error = MembershipError>,
    {
        let policy = policy();
        let env = PolicyEnv::new(&policy, now);
        action.pre_validate(state, &env)?;
        action.apply(state, &env)?;
        action.post_validate(state, &env)
    }
}
