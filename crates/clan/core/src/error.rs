//! Common error infrastructure for clan-core.
//!
//! Domain errors live next to the rules that raise them (see
//! [`crate::transition::MembershipError`]); this module holds the shared
//! classification used by every layer above the engine.

use serde::{Deserialize, Serialize};

/// Severity level of an error, used for categorization and caller-side handling.
///
/// - **Recoverable**: the request may succeed later without changes (a cooldown
///   expires, a slot frees up in the clan)
/// - **Validation**: the request itself is wrong and must not be retried as-is
/// - **Internal**: stored state is inconsistent and needs investigation
/// - **Fatal**: the store or policy is unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if the same request may succeed at a later time.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates a bug or corrupted data.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Kind of record an error refers to.
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
pub enum EntityKind {
    Game,
    Player,
    Clan,
    Membership,
    Hook,
}

/// Common trait for all clan-core errors.
///
/// Gives callers a uniform way to pick a status code or log level without
/// matching every variant of every error enum.
pub trait ClanError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Returns a stable identifier for this error variant.
    ///
    /// Codes are part of the public contract: API layers map them onto
    /// user-facing messages, so they must not change between releases.
    fn error_code(&self) -> &'static str;
}
