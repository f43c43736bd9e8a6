use core::fmt;

use crate::error::{ClanError, ErrorSeverity};
use crate::transition::{
    ActionKind, ApplyAction, ApproveAction, DeleteAction, DemoteAction, DenyAction, InviteAction,
    LeaveAction, MembershipError, MembershipTransition, PromoteAction, TransferOwnershipAction,
};

/// Identifies which stage of the transition pipeline produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TransitionPhase {
    PreValidate,
    Apply,
    PostValidate,
}

/// Associates a transition phase with the underlying error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPhaseError<E> {
    pub phase: TransitionPhase,
    pub error: E,
}

impl<E> TransitionPhaseError<E> {
    pub fn new(phase: TransitionPhase, error: E) -> Self {
        Self { phase, error }
    }
}

impl<E: fmt::Display> fmt::Display for TransitionPhaseError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (during {})", self.error, self.phase)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TransitionPhaseError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

type PhaseError<T> = TransitionPhaseError<<T as MembershipTransition>::Error>;

/// Errors surfaced while executing a membership action through the engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    #[error("apply failed: {0}")]
    Apply(PhaseError<ApplyAction>),
    #[error("invite failed: {0}")]
    Invite(PhaseError<InviteAction>),
    #[error("approve failed: {0}")]
    Approve(PhaseError<ApproveAction>),
    #[error("deny failed: {0}")]
    Deny(PhaseError<DenyAction>),
    #[error("promote failed: {0}")]
    Promote(PhaseError<PromoteAction>),
    #[error("demote failed: {0}")]
    Demote(PhaseError<DemoteAction>),
    #[error("delete failed: {0}")]
    Delete(PhaseError<DeleteAction>),
    #[error("leave failed: {0}")]
    Leave(PhaseError<LeaveAction>),
    #[error("ownership transfer failed: {0}")]
    TransferOwnership(PhaseError<TransferOwnershipAction>),
}

macro_rules! phase_error {
    ($self:expr, |$inner:ident| $body:expr) => {
        match $self {
            ExecuteError::Apply($inner) => $body,
            ExecuteError::Invite($inner) => $body,
            ExecuteError::Approve($inner) => $body,
            ExecuteError::Deny($inner) => $body,
            ExecuteError::Promote($inner) => $body,
            ExecuteError::Demote($inner) => $body,
            ExecuteError::Delete($inner) => $body,
            ExecuteError::Leave($inner) => $body,
            ExecuteError::TransferOwnership($inner) => $body,
        }
    };
}

impl ExecuteError {
    pub fn action(&self) -> ActionKind {
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

    pub fn phase(&self) -> TransitionPhase {
        phase_error!(self, |inner| inner.phase)
    }

    /// The rule violation behind this failure.
    pub fn membership_error(&self) -> &MembershipError {
        phase_error!(self, |inner| &inner.error)
    }

    pub fn into_membership_error(self) -> MembershipError {
        phase_error!(self, |inner| inner.error)
    }
}

impl ClanError for ExecuteError {
    fn severity(&self) -> ErrorSeverity {
        match self.phase() {
            // A transition that passed validation and still broke the clan is a bug.
            TransitionPhase::PostValidate => ErrorSeverity::Internal,
            _ => self.membership_error().severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        self.membership_error().error_code()
    }
}
