//! Membership rule engine for player clans.
//!
//! Games configure a level ladder and numeric thresholds ([`GamePolicy`]);
//! callers load a [`ClanState`] snapshot inside a store transaction, run one
//! [`MembershipAction`] through the [`ClanEngine`] and persist the returned
//! [`StateDelta`]. The crate performs no I/O and never reads a clock.
pub mod cooldown;
pub mod engine;
pub mod error;
pub mod ladder;
pub mod policy;
pub mod serde_helpers;
pub mod state;
pub mod transition;

pub use cooldown::{CooldownKind, CooldownRecord, CooldownTracker};
pub use engine::{ClanEngine, ExecuteError, TransitionPhase, TransitionPhaseError};
pub use error::{ClanError, EntityKind, ErrorSeverity};
pub use ladder::{InvalidLevels, Ladder, Level, LevelMap, sorted_levels};
pub use policy::{
    Game, GameDefinition, GamePolicy, MembershipRules, Metadata, OwnerDemotion,
};
pub use state::{
    Clan, ClanId, ClanState, GameId, Membership, MembershipStatus, Player, PlayerId, PublicId,
    RequestKind, StateDelta, Timestamp,
};
pub use transition::{
    ActionKind, Actor, ApplyAction, ApproveAction, ClanCharter, DeleteAction, DemoteAction,
    DenyAction, InviteAction, LeaveAction, MembershipAction, MembershipError,
    MembershipTransition, PolicyEnv, PromoteAction, TransferOwnershipAction, found_clan,
};
