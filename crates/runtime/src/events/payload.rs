//! Webhook payload builders.
//!
//! Payloads expose public ids only. Internal row ids and the nested game id of
//! each entity are left out; the game appears once at the top as `gameID`.

use clan_core::{Clan, Game, Player, PublicId};
use serde_json::{Map, Value, json};

pub fn game_snapshot(game: &Game) -> Value {
    json!({
        "gameID": game.public_id,
        "name": game.name,
        "membershipLevels": game.membership_levels,
        "minMembershipLevel": game.min_membership_level,
        "maxMembershipLevel": game.max_membership_level,
        "rules": serde_json::to_value(&game.rules).unwrap_or(Value::Null),
        "metadata": game.metadata,
    })
}

pub fn player_snapshot(player: &Player) -> Value {
    json!({
        "publicID": player.public_id,
        "name": player.name,
        "metadata": player.metadata,
        "membershipCount": player.membership_count,
        "ownershipCount": player.ownership_count,
    })
}

pub fn clan_snapshot(clan: &Clan, owner: &PublicId) -> Value {
    json!({
        "publicID": clan.public_id,
        "name": clan.name,
        "metadata": clan.metadata,
        "allowApplication": clan.allow_application,
        "autoJoin": clan.auto_join,
        "membershipCount": clan.membership_count,
        "owner": owner,
    })
}

/// Adds `gameID` to an entity snapshot.
pub fn with_game(game: &PublicId, snapshot: Value) -> Value {
    let mut object = match snapshot {
        Value::Object(object) => object,
        other => Map::from_iter([("value".to_string(), other)]),
    };
    object.insert("gameID".into(), json!(game));
    Value::Object(object)
}

/// Payload of an application, invitation, rank change or removal.
#[derive(Debug, Clone)]
pub struct MembershipPayload {
    pub clan: Value,
    pub player: Value,
    /// Name of the player's membership level after the change.
    pub level: Option<String>,
    /// Player who performed the operation.
    pub requestor: Value,
    /// Player who created the request, for approvals and denials.
    pub creator: Option<Value>,
    pub message: Option<String>,
}

impl MembershipPayload {
    pub fn into_value(self, game: &PublicId) -> Value {
        let mut player = self.player;
        if let (Value::Object(object), Some(level)) = (&mut player, self.level) {
            object.insert("membershipLevel".into(), Value::String(level));
        }

        let mut payload = json!({
            "gameID": game,
            "clan": self.clan,
            "player": player,
            "requestor": self.requestor,
        });
        if let Value::Object(object) = &mut payload {
            if let Some(creator) = self.creator {
                object.insert("creator".into(), creator);
            }
            if let Some(message) = self.message.filter(|m| !m.is_empty()) {
                object.insert("message".into(), Value::String(message));
            }
        }
        payload
    }
}

/// Payload of an ownership change. `new_owner` is absent when the clan dissolved.
pub fn ownership_payload(
    game: &PublicId,
    clan: Value,
    previous_owner: Value,
    new_owner: Option<Value>,
    dissolved: bool,
) -> Value {
    json!({
        "gameID": game,
        "clan": clan,
        "previousOwner": previous_owner,
        "newOwner": new_owner,
        "isDeleted": dissolved,
    })
}
