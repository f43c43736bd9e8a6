//! Unified error type surfaced by the clan service.
//!
//! Wraps rule violations, engine failures and store errors so callers can
//! bubble them up with consistent codes.

use clan_core::{ClanError, ErrorSeverity, ExecuteError, MembershipError};
use thiserror::Error;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Membership(#[from] MembershipError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("hook dispatcher join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

impl ServiceError {
    /// The rule violation behind this error, if it is one.
    pub fn membership_error(&self) -> Option<&MembershipError> {
        match self {
            Self::Membership(error) => Some(error),
            Self::Execute(error) => Some(error.membership_error()),
            _ => None,
        }
    }
}

impl From<clan_core::InvalidLevels> for ServiceError {
    fn from(error: clan_core::InvalidLevels) -> Self {
        Self::Membership(error.into())
    }
}

impl ClanError for ServiceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Membership(error) => error.severity(),
            Self::Execute(error) => error.severity(),
            Self::Repository(RepositoryError::Conflict { .. }) => ErrorSeverity::Validation,
            Self::Repository(RepositoryError::LockPoisoned) => ErrorSeverity::Fatal,
            Self::Repository(_) => ErrorSeverity::Internal,
            Self::WorkerJoin(_) | Self::HttpClient(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Membership(error) => error.error_code(),
            Self::Execute(error) => error.error_code(),
            Self::Repository(RepositoryError::Conflict { .. }) => "STORE_CONFLICT",
            Self::Repository(_) => "STORE_ERROR",
            Self::WorkerJoin(_) => "RUNTIME_WORKER_JOIN",
            Self::HttpClient(_) => "RUNTIME_HTTP_CLIENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clan_core::{EntityKind, PublicId};

    #[test]
    fn rule_violations_keep_their_codes() {
        let error = ServiceError::from(MembershipError::ClanFull {
            clan: PublicId::new("c"),
            max_members: 3,
        });
        assert_eq!(error.error_code(), "MEMBERSHIP_CLAN_FULL");
        assert!(error.severity().is_recoverable());
        assert!(error.membership_error().is_some());
    }

    #[test]
    fn store_conflicts_are_validation_errors() {
        let error = ServiceError::from(RepositoryError::Conflict {
            entity: EntityKind::Clan,
            id: "c".into(),
        });
        assert_eq!(error.severity(), ErrorSeverity::Validation);
        assert_eq!(error.error_code(), "STORE_CONFLICT");
        assert!(error.membership_error().is_none());
    }
}
