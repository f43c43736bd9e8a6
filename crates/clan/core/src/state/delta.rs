use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Clan, ClanState, Membership, Player, Timestamp};
use crate::cooldown::CooldownRecord;
use crate::transition::ActionKind;

/// Records an executed transition has to write back to the store.
///
/// Only rows that differ from the snapshot are listed; each entry holds the
/// full post-transition value so stores can upsert without re-reading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    /// The transition that produced this delta.
    pub action: ActionKind,

    /// Evaluation time handed to the engine.
    pub at: Timestamp,

    /// Updated clan row, if any clan field changed.
    pub clan: Option<Clan>,

    /// The clan lost its last member and must be removed with its records.
    pub clan_dissolved: bool,

    pub players: Vec<Player>,
    pub memberships: Vec<Membership>,
    pub cooldowns: Vec<CooldownRecord>,
}

impl StateDelta {
    /// Creates a delta by comparing two snapshots of the same clan.
    pub fn from_states(
        action: ActionKind,
        at: Timestamp,
        before: &ClanState,
        after: &ClanState,
    ) -> Self {
        Self {
            action,
            at,
            clan: (before.clan != after.clan).then(|| after.clan.clone()),
            clan_dissolved: after.dissolved && !before.dissolved,
            players: changed_values(&before.players, &after.players),
            memberships: changed_values(&before.memberships, &after.memberships),
            cooldowns: changed_values(before.cooldowns.as_map(), after.cooldowns.as_map()),
        }
    }

    /// Delta of a freshly founded clan: every record of the snapshot is new.
    pub fn founded(state: &ClanState, at: Timestamp) -> Self {
        Self {
            action: ActionKind::Found,
            at,
            clan: Some(state.clan.clone()),
            clan_dissolved: false,
            players: state.players.values().cloned().collect(),
            memberships: state.memberships.values().cloned().collect(),
            cooldowns: Vec::new(),
        }
    }

    /// Returns true if the transition changed nothing.
    pub fn is_empty(&self) -> bool {
        self.clan.is_none()
            && !self.clan_dissolved
            && self.players.is_empty()
            && self.memberships.is_empty()
            && self.cooldowns.is_empty()
    }
}

/// Values present in `after` that are new or differ from `before`.
///
/// Entries are never removed from a snapshot (memberships are soft-deleted),
/// so additions and updates are the only cases.
fn changed_values<K, V>(before: &BTreeMap<K, V>, after: &BTreeMap<K, V>) -> Vec<V>
where
    K: Ord,
    V: PartialEq + Clone,
{
    after
        .iter()
        .filter(|(key, value)| before.get(key) != Some(value))
        .map(|(_, value)| value.clone())
        .collect()
}
