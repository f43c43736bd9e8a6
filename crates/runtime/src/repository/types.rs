//! Records owned by the runtime rather than the rule engine.

use clan_core::{GameId, PublicId};
use serde::{Deserialize, Serialize};

use crate::events::HookEventKind;

/// Webhook registered by a game for one event kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub id: u64,
    pub game_id: GameId,
    pub public_id: PublicId,
    pub event_kind: HookEventKind,
    /// Target URL; `{{path}}` placeholders are filled from the event payload.
    pub url: String,
}

/// Tables that hand out sequential ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Games,
    Players,
    Clans,
    Hooks,
}
