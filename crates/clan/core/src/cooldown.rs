//! Re-application cooldowns after a denial or a removal.
//!
//! The tracker keeps, per (clan, player) pair, the time of the latest deny and
//! the latest delete. Only the most recent of the two counts: a player removed
//! yesterday and denied a minute ago waits out the deny window, not both.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::policy::MembershipRules;
use crate::state::{ClanId, PlayerId, Timestamp};

/// Event that starts a cooldown window.
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
pub enum CooldownKind {
    Deny,
    Delete,
}

/// Latest cooldown events for one (clan, player) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecord {
    pub clan_id: ClanId,
    pub player_id: PlayerId,
    pub last_deny: Option<Timestamp>,
    pub last_delete: Option<Timestamp>,
}

impl CooldownRecord {
    pub fn new(clan_id: ClanId, player_id: PlayerId) -> Self {
        Self {
            clan_id,
            player_id,
            last_deny: None,
            last_delete: None,
        }
    }

    /// Most recent event of either kind. On a tie the delete wins.
    pub fn latest(&self) -> Option<(CooldownKind, Timestamp)> {
        match (self.last_deny, self.last_delete) {
            (Some(deny), Some(delete)) if deny > delete => Some((CooldownKind::Deny, deny)),
            (_, Some(delete)) => Some((CooldownKind::Delete, delete)),
            (Some(deny), None) => Some((CooldownKind::Deny, deny)),
            (None, None) => None,
        }
    }
}

/// Cooldown bookkeeping for the pairs loaded into a clan snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CooldownTracker {
    records: BTreeMap<(ClanId, PlayerId), CooldownRecord>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = CooldownRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| ((record.clan_id, record.player_id), record))
                .collect(),
        }
    }

    /// Records a deny or delete event for the pair.
    pub fn record(&mut self, player: PlayerId, clan: ClanId, kind: CooldownKind, at: Timestamp) {
        let record = self
            .records
            .entry((clan, player))
            .or_insert_with(|| CooldownRecord::new(clan, player));
        match kind {
            CooldownKind::Deny => record.last_deny = Some(at),
            CooldownKind::Delete => record.last_delete = Some(at),
        }
    }

    pub fn get(&self, player: PlayerId, clan: ClanId) -> Option<&CooldownRecord> {
        self.records.get(&(clan, player))
    }

    /// Time left before the player may apply to the clan again, if any.
    pub fn remaining(
        &self,
        player: PlayerId,
        clan: ClanId,
        now: Timestamp,
        rules: &MembershipRules,
    ) -> Option<(CooldownKind, Duration)> {
        let (kind, at) = self.get(player, clan)?.latest()?;
        let window = rules.cooldown_for(kind);
        let elapsed = now.saturating_since(at);
        window
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
            .map(|left| (kind, left))
    }

    /// True while `now - last_event < cooldown` for the latest event of the pair.
    pub fn is_on_cooldown(
        &self,
        player: PlayerId,
        clan: ClanId,
        now: Timestamp,
        rules: &MembershipRules,
    ) -> bool {
        self.remaining(player, clan, now, rules).is_some()
    }

    pub fn records(&self) -> impl Iterator<Item = &CooldownRecord> {
        self.records.values()
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<(ClanId, PlayerId), CooldownRecord> {
        &self.records
    }
}
