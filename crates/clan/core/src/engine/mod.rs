mod errors;

use crate::state::{ClanState, StateDelta};
use crate::transition::{MembershipAction, MembershipTransition, PolicyEnv};

pub use errors::{ExecuteError, TransitionPhase, TransitionPhaseError};

type TransitionResult<E> = Result<(), TransitionPhaseError<E>>;

macro_rules! dispatch_transition {
    ($action:expr, $state:expr, $env:expr, { $($variant:ident),+ $(,)? }) => {{
        match $action {
            $(
                MembershipAction::$variant(transition) => {
                    drive_transition(transition, $state, $env).map_err(ExecuteError::$variant)
                }
            )+
        }
    }};
}

/// Executes membership actions against one clan snapshot.
///
/// Execution is all-or-nothing: when any phase fails the snapshot is restored
/// to its state before the call, so callers can keep using it.
pub struct ClanEngine<'a> {
    state: &'a mut ClanState,
}

impl<'a> ClanEngine<'a> {
    pub fn new(state: &'a mut ClanState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ClanState {
        &*self.state
    }

    /// Runs the action through its transition pipeline and returns what changed.
    pub fn execute(
        &mut self,
        env: PolicyEnv<'_>,
        action: &MembershipAction,
    ) -> Result<StateDelta, ExecuteError> {
        let before = self.state.clone();

        let result = dispatch_transition!(action, &mut *self.state, &env, {
            Apply,
            Invite,
            Approve,
            Deny,
            Promote,
            Demote,
            Delete,
            Leave,
            TransferOwnership,
        });

        match result {
            Ok(()) => Ok(StateDelta::from_states(
                action.kind(),
                env.now,
                &before,
                &*self.state,
            )),
            Err(error) => {
                *self.state = before;
                Err(error)
            }
        }
    }
}

#[inline]
fn drive_transition<T>(
    transition: &T,
    state: &mut ClanState,
    env: &PolicyEnv<'_>,
) -> TransitionResult<T::Error>
where
    T: MembershipTransition,
{
    transition
        .pre_validate(&*state, env)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::PreValidate, error))?;

    transition
        .apply(state, env)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::Apply, error))?;

    transition
        .post_validate(&*state, env)
        .map_err(|error| TransitionPhaseError::new(TransitionPhase::PostValidate, error))
}
