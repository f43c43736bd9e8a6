use serde::{Deserialize, Serialize};

use super::{ClanId, GameId, PlayerId, PublicId, Timestamp};
use crate::policy::Metadata;

/// A player registered in one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub game_id: GameId,
    pub public_id: PublicId,
    pub name: String,
    pub metadata: Metadata,
    /// Active memberships held by the player, owned clans included.
    pub membership_count: u32,
    pub ownership_count: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Player {
    pub fn new(
        id: PlayerId,
        game_id: GameId,
        public_id: PublicId,
        name: impl Into<String>,
        metadata: Metadata,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            game_id,
            public_id,
            name: name.into(),
            metadata,
            membership_count: 0,
            ownership_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A clan and its denormalized roster size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clan {
    pub id: ClanId,
    pub game_id: GameId,
    pub public_id: PublicId,
    pub name: String,
    pub owner_id: PlayerId,
    /// Active memberships, the owner's included.
    pub membership_count: u32,
    pub allow_application: bool,
    pub auto_join: bool,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Whether a pending request came from the player or from a member.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Application,
    Invitation,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Active,
    Denied,
    Deleted,
}

/// The link between one player and one clan.
///
/// There is a single record per (clan, player) pair. A new request after a
/// denial or removal reopens that record instead of creating another one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub game_id: GameId,
    pub clan_id: ClanId,
    pub player_id: PlayerId,
    pub level: i64,
    pub approved: bool,
    pub denied: bool,
    pub deleted: bool,
    pub requestor_id: PlayerId,
    pub approver_id: Option<PlayerId>,
    pub denier_id: Option<PlayerId>,
    pub deleted_by: Option<PlayerId>,
    pub message: Option<String>,
    pub requested_at: Timestamp,
    pub approved_at: Option<Timestamp>,
    pub denied_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
}

impl Membership {
    /// Creates a pending request.
    pub fn request(
        clan: &Clan,
        player: PlayerId,
        requestor: PlayerId,
        level: i64,
        message: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            game_id: clan.game_id,
            clan_id: clan.id,
            player_id: player,
            level,
            approved: false,
            denied: false,
            deleted: false,
            requestor_id: requestor,
            approver_id: None,
            denier_id: None,
            deleted_by: None,
            message,
            requested_at: now,
            approved_at: None,
            denied_at: None,
            deleted_at: None,
        }
    }

    /// Turns a denied or deleted record back into a pending request.
    pub fn reopen(
        &mut self,
        requestor: PlayerId,
        level: i64,
        message: Option<String>,
        now: Timestamp,
    ) {
        let clan_id = self.clan_id;
        let game_id = self.game_id;
        let player_id = self.player_id;
        *self = Self {
            game_id,
            clan_id,
            player_id,
            level,
            approved: false,
            denied: false,
            deleted: false,
            requestor_id: requestor,
            approver_id: None,
            denier_id: None,
            deleted_by: None,
            message,
            requested_at: now,
            approved_at: None,
            denied_at: None,
            deleted_at: None,
        };
    }

    pub fn approve(&mut self, approver: PlayerId, level: i64, now: Timestamp) {
        self.approved = true;
        self.level = level;
        self.approver_id = Some(approver);
        self.approved_at = Some(now);
    }

    pub fn deny(&mut self, denier: PlayerId, now: Timestamp) {
        self.denied = true;
        self.denier_id = Some(denier);
        self.denied_at = Some(now);
    }

    pub fn soft_delete(&mut self, by: PlayerId, now: Timestamp) {
        self.deleted = true;
        self.deleted_by = Some(by);
        self.deleted_at = Some(now);
    }

    pub fn is_active(&self) -> bool {
        self.approved && !self.deleted
    }

    pub fn is_pending(&self) -> bool {
        !self.approved && !self.denied && !self.deleted
    }

    pub fn request_kind(&self) -> RequestKind {
        if self.requestor_id == self.player_id {
            RequestKind::Application
        } else {
            RequestKind::Invitation
        }
    }

    pub fn status(&self) -> MembershipStatus {
        if self.deleted {
            MembershipStatus::Deleted
        } else if self.approved {
            MembershipStatus::Active
        } else if self.denied {
            MembershipStatus::Denied
        } else {
            MembershipStatus::Pending
        }
    }
}
