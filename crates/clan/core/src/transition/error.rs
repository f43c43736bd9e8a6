use std::time::Duration;

use crate::cooldown::CooldownKind;
use crate::error::{ClanError, EntityKind, ErrorSeverity};
use crate::ladder::InvalidLevels;
use crate::state::{MembershipStatus, PublicId};

/// Reasons a membership transition is rejected.
///
/// Every variant carries the public ids involved so API layers can render a
/// precise message without another lookup.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("invalid membership levels: {0}")]
    InvalidLevels(#[from] InvalidLevels),

    #[error("invalid game policy field '{field}': {reason}")]
    InvalidPolicy {
        field: &'static str,
        reason: &'static str,
    },

    #[error("player '{player}' holds level {level}, which is not on the game's ladder")]
    UnknownLevel { player: PublicId, level: i64 },

    #[error("player '{player}' already has a {status} membership in clan '{clan}'")]
    AlreadyMember {
        player: PublicId,
        clan: PublicId,
        status: MembershipStatus,
    },

    #[error("clan '{clan}' is full ({max_members} members)")]
    ClanFull { clan: PublicId, max_members: u32 },

    #[error("player '{player}' already belongs to {max_clans} clans")]
    TooManyClans { player: PublicId, max_clans: u32 },

    #[error(
        "player '{player}' must wait {}s before joining clan '{clan}' again after a {kind}",
        .remaining.as_secs()
    )]
    CooldownActive {
        player: PublicId,
        clan: PublicId,
        kind: CooldownKind,
        remaining: Duration,
    },

    #[error(
        "player '{actor}' cannot {action}: requires level {required}, has {}",
        .actual.map_or_else(|| "no membership".to_string(), |level| level.to_string())
    )]
    InsufficientRank {
        actor: PublicId,
        action: &'static str,
        required: i64,
        actual: Option<i64>,
    },

    #[error("player '{player}' at level {level} is already at the {bound} of the ladder")]
    LevelBoundary {
        player: PublicId,
        level: i64,
        bound: &'static str,
    },

    #[error("player '{player}' has no pending request for clan '{clan}'")]
    NoPendingRequest { player: PublicId, clan: PublicId },

    #[error("player '{player}' is not an active member of clan '{clan}'")]
    NotAMember { player: PublicId, clan: PublicId },

    #[error("player '{actor}' cannot {action}: {reason}")]
    ActorNotPermitted {
        actor: PublicId,
        action: &'static str,
        reason: &'static str,
    },

    #[error("player '{owner}' owns clan '{clan}' and cannot be targeted")]
    OwnerProtected { clan: PublicId, owner: PublicId },

    #[error("clan '{clan}' does not accept applications")]
    ApplicationsClosed { clan: PublicId },

    #[error("clan invariant violated: {0}")]
    InvariantViolated(&'static str),
}

impl ClanError for MembershipError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ClanFull { .. } | Self::TooManyClans { .. } | Self::CooldownActive { .. } => {
                ErrorSeverity::Recoverable
            }
            Self::UnknownLevel { .. } | Self::InvariantViolated(_) => ErrorSeverity::Internal,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "MEMBERSHIP_NOT_FOUND",
            Self::InvalidLevels(_) => "MEMBERSHIP_INVALID_LEVELS",
            Self::InvalidPolicy { .. } => "MEMBERSHIP_INVALID_POLICY",
            Self::UnknownLevel { .. } => "MEMBERSHIP_UNKNOWN_LEVEL",
            Self::AlreadyMember { .. } => "MEMBERSHIP_ALREADY_MEMBER",
            Self::ClanFull { .. } => "MEMBERSHIP_CLAN_FULL",
            Self::TooManyClans { .. } => "MEMBERSHIP_TOO_MANY_CLANS",
            Self::CooldownActive { .. } => "MEMBERSHIP_COOLDOWN_ACTIVE",
            Self::InsufficientRank { .. } => "MEMBERSHIP_INSUFFICIENT_RANK",
            Self::LevelBoundary { .. } => "MEMBERSHIP_LEVEL_BOUNDARY",
            Self::NoPendingRequest { .. } => "MEMBERSHIP_NO_PENDING_REQUEST",
            Self::NotAMember { .. } => "MEMBERSHIP_NOT_A_MEMBER",
            Self::ActorNotPermitted { .. } => "MEMBERSHIP_ACTOR_NOT_PERMITTED",
            Self::OwnerProtected { .. } => "MEMBERSHIP_OWNER_PROTECTED",
            Self::ApplicationsClosed { .. } => "MEMBERSHIP_APPLICATIONS_CLOSED",
            Self::InvariantViolated(_) => "MEMBERSHIP_INVARIANT_VIOLATED",
        }
    }
}
