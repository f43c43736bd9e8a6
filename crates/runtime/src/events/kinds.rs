use serde::{Deserialize, Serialize};

use super::bus::Topic;

/// Kinds of committed changes a game can register webhooks for.
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
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HookEventKind {
    GameUpdated,
    PlayerCreated,
    PlayerUpdated,
    ClanCreated,
    ClanUpdated,
    /// The owner left; ownership moved on or the clan was dissolved.
    ClanLeft,
    OwnershipTransferred,
    ApplicationCreated,
    InvitationCreated,
    ApplicationApproved,
    ApplicationDenied,
    InvitationApproved,
    InvitationDenied,
    MemberPromoted,
    MemberDemoted,
    MemberLeft,
    MemberDeleted,
}

impl HookEventKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn topic(self) -> Topic {
        match self {
            Self::GameUpdated => Topic::Game,
            Self::PlayerCreated | Self::PlayerUpdated => Topic::Player,
            Self::ClanCreated | Self::ClanUpdated | Self::ClanLeft | Self::OwnershipTransferred => {
                Topic::Clan
            }
            Self::ApplicationCreated
            | Self::InvitationCreated
            | Self::ApplicationApproved
            | Self::ApplicationDenied
            | Self::InvitationApproved
            | Self::InvitationDenied
            | Self::MemberPromoted
            | Self::MemberDemoted
            | Self::MemberLeft
            | Self::MemberDeleted => Topic::Membership,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn names_parse_back() {
        for kind in HookEventKind::iter() {
            assert_eq!(HookEventKind::from_str(kind.as_str()), Ok(kind));
        }
        assert_eq!(HookEventKind::MemberLeft.as_str(), "member_left");
    }
}
