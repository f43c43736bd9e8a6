//! Per-game membership policy.
//!
//! A [`Game`] is the persisted record; [`GamePolicy`] is the immutable view the
//! engine evaluates against (validated ladder plus numeric rules). Callers build
//! a fresh `GamePolicy` for every request, so a game update never races a
//! transition that is already running.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cooldown::CooldownKind;
use crate::ladder::{InvalidLevels, Ladder, Level, LevelMap};
use crate::serde_helpers::duration_secs;
use crate::state::{GameId, PublicId, Timestamp};
use crate::transition::MembershipError;

/// Free-form JSON document attached to games, players and clans.
pub type Metadata = Map<String, Value>;

/// Level the previous owner lands on after handing a clan over.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
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
pub enum OwnerDemotion {
    /// Second-highest rank of the ladder.
    #[default]
    Penultimate,
    /// Lowest rank of the ladder.
    Minimum,
}

impl OwnerDemotion {
    pub fn level(self, ladder: &Ladder) -> &Level {
        match self {
            OwnerDemotion::Penultimate => ladder.penultimate(),
            OwnerDemotion::Minimum => ladder.min_level(),
        }
    }
}

/// Numeric thresholds a game configures for its clans.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRules {
    pub min_level_to_accept_application: i64,
    pub min_level_to_create_invitation: i64,
    pub min_level_to_remove_member: i64,
    /// Rank gap required between remover and removed member.
    pub min_level_offset_to_remove_member: i64,
    pub min_level_offset_to_promote_member: i64,
    pub min_level_offset_to_demote_member: i64,
    pub max_members: u32,
    pub max_clans_per_player: u32,
    #[serde(with = "duration_secs")]
    pub cooldown_after_deny: Duration,
    #[serde(with = "duration_secs")]
    pub cooldown_after_delete: Duration,
    #[serde(default)]
    pub owner_demotion: OwnerDemotion,
}

impl MembershipRules {
    pub fn cooldown_for(&self, kind: CooldownKind) -> Duration {
        match kind {
            CooldownKind::Deny => self.cooldown_after_deny,
            CooldownKind::Delete => self.cooldown_after_delete,
        }
    }

    pub fn validate(&self) -> Result<(), MembershipError> {
        let offsets = [
            (
                "minLevelOffsetToRemoveMember",
                self.min_level_offset_to_remove_member,
            ),
            (
                "minLevelOffsetToPromoteMember",
                self.min_level_offset_to_promote_member,
            ),
            (
                "minLevelOffsetToDemoteMember",
                self.min_level_offset_to_demote_member,
            ),
        ];
        if let Some((field, _)) = offsets.iter().find(|(_, offset)| *offset < 0) {
            return Err(MembershipError::InvalidPolicy {
                field: *field,
                reason: "offsets must not be negative",
            });
        }
        if self.max_members == 0 {
            return Err(MembershipError::InvalidPolicy {
                field: "maxMembers",
                reason: "a clan must be able to hold its owner",
            });
        }
        if self.max_clans_per_player == 0 {
            return Err(MembershipError::InvalidPolicy {
                field: "maxClansPerPlayer",
                reason: "players must be able to join at least one clan",
            });
        }
        Ok(())
    }
}

/// Caller-supplied description of a game, used for both create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDefinition {
    pub public_id: PublicId,
    pub name: String,
    pub membership_levels: LevelMap,
    #[serde(flatten)]
    pub rules: MembershipRules,
    #[serde(default)]
    pub metadata: Metadata,
}

impl GameDefinition {
    /// Checks the level document and the numeric rules, returning the ladder.
    pub fn validate(&self) -> Result<Ladder, MembershipError> {
        let ladder = Ladder::from_map(&self.membership_levels)?.require_game_ladder()?;
        self.rules.validate()?;
        Ok(ladder)
    }
}

/// Persisted game record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub public_id: PublicId,
    pub name: String,
    pub membership_levels: LevelMap,
    /// Derived from `membership_levels` by [`Game::new`] and [`Game::redefine`].
    pub min_membership_level: i64,
    pub max_membership_level: i64,
    #[serde(flatten)]
    pub rules: MembershipRules,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Game {
    /// Builds a new game record from a validated definition.
    pub fn new(
        id: GameId,
        definition: GameDefinition,
        now: Timestamp,
    ) -> Result<Self, MembershipError> {
        let ladder = definition.validate()?;
        Ok(Self {
            id,
            public_id: definition.public_id,
            name: definition.name,
            membership_levels: definition.membership_levels,
            min_membership_level: ladder.min_level().rank,
            max_membership_level: ladder.max_level().rank,
            rules: definition.rules,
            metadata: definition.metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces name, levels, rules and metadata, keeping identity and creation time.
    pub fn redefine(
        &mut self,
        definition: GameDefinition,
        now: Timestamp,
    ) -> Result<(), MembershipError> {
        let ladder = definition.validate()?;
        self.name = definition.name;
        self.membership_levels = definition.membership_levels;
        self.min_membership_level = ladder.min_level().rank;
        self.max_membership_level = ladder.max_level().rank;
        self.rules = definition.rules;
        self.metadata = definition.metadata;
        self.updated_at = now;
        Ok(())
    }

    pub fn ladder(&self) -> Result<Ladder, InvalidLevels> {
        Ladder::from_map(&self.membership_levels)?.require_game_ladder()
    }

    pub fn policy(&self) -> Result<GamePolicy, InvalidLevels> {
        Ok(GamePolicy::new(self.ladder()?, self.rules.clone()))
    }
}

/// Immutable, validated policy handed to the engine for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GamePolicy {
    ladder: Ladder,
    rules: MembershipRules,
}

impl GamePolicy {
    pub fn new(ladder: Ladder, rules: MembershipRules) -> Self {
        Self { ladder, rules }
    }

    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn rules(&self) -> &MembershipRules {
        &self.rules
    }

    /// Level assigned to new and freshly approved members.
    pub fn entry_level(&self) -> &Level {
        self.ladder.min_level()
    }

    /// Level held by the clan owner.
    pub fn owner_level(&self) -> &Level {
        self.ladder.max_level()
    }

    /// Level given to an owner who hands the clan to someone else.
    pub fn former_owner_level(&self) -> &Level {
        self.rules.owner_demotion.level(&self.ladder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> MembershipRules {
        MembershipRules {
            min_level_to_accept_application: 2,
            min_level_to_create_invitation: 2,
            min_level_to_remove_member: 3,
            min_level_offset_to_remove_member: 1,
            min_level_offset_to_promote_member: 1,
            min_level_offset_to_demote_member: 1,
            max_members: 50,
            max_clans_per_player: 1,
            cooldown_after_deny: Duration::from_secs(3_600),
            cooldown_after_delete: Duration::from_secs(600),
            owner_demotion: OwnerDemotion::Penultimate,
        }
    }

    fn definition(levels: Value) -> GameDefinition {
        GameDefinition {
            public_id: PublicId::new("game-1"),
            name: "Game".into(),
            membership_levels: levels.as_object().cloned().unwrap_or_default(),
            rules: rules(),
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn new_game_derives_level_bounds() {
        let game = Game::new(
            GameId(1),
            definition(json!({"member": 1, "elder": 2, "coleader": 3, "leader": 4})),
            Timestamp(5),
        )
        .unwrap();

        assert_eq!(game.min_membership_level, 1);
        assert_eq!(game.max_membership_level, 4);
        assert_eq!(game.created_at, game.updated_at);
    }

    #[test]
    fn redefine_recomputes_bounds() {
        let mut game = Game::new(
            GameId(1),
            definition(json!({"member": 1, "leader": 4})),
            Timestamp(5),
        )
        .unwrap();

        game.redefine(definition(json!({"recruit": -3, "chief": 40})), Timestamp(9))
            .unwrap();

        assert_eq!(game.min_membership_level, -3);
        assert_eq!(game.max_membership_level, 40);
        assert_eq!(game.created_at, Timestamp(5));
        assert_eq!(game.updated_at, Timestamp(9));
    }

    #[test]
    fn rejects_bad_levels_and_rules() {
        let err = Game::new(GameId(1), definition(json!({"solo": 1})), Timestamp(0)).unwrap_err();
        assert!(matches!(
            err,
            MembershipError::InvalidLevels(InvalidLevels::TooFew { .. })
        ));

        let mut bad = definition(json!({"member": 1, "leader": 2}));
        bad.rules.max_members = 0;
        assert!(matches!(
            Game::new(GameId(1), bad, Timestamp(0)),
            Err(MembershipError::InvalidPolicy {
                field: "maxMembers",
                ..
            })
        ));
    }

    #[test]
    fn former_owner_level_follows_demotion_setting() {
        let ladder = Ladder::from_ranks([("member", 1), ("elder", 2), ("leader", 3)]).unwrap();
        let mut policy_rules = rules();
        assert_eq!(
            GamePolicy::new(ladder.clone(), policy_rules.clone())
                .former_owner_level()
                .rank,
            2
        );

        policy_rules.owner_demotion = OwnerDemotion::Minimum;
        assert_eq!(
            GamePolicy::new(ladder, policy_rules).former_owner_level().rank,
            1
        );
    }

    #[test]
    fn definition_reads_camel_case_json() {
        let parsed: GameDefinition = serde_json::from_value(json!({
            "publicId": "g",
            "name": "G",
            "membershipLevels": {"member": 1, "leader": 2},
            "minLevelToAcceptApplication": 1,
            "minLevelToCreateInvitation": 1,
            "minLevelToRemoveMember": 2,
            "minLevelOffsetToRemoveMember": 1,
            "minLevelOffsetToPromoteMember": 1,
            "minLevelOffsetToDemoteMember": 1,
            "maxMembers": 10,
            "maxClansPerPlayer": 2,
            "cooldownAfterDeny": 30,
            "cooldownAfterDelete": 60
        }))
        .unwrap();

        assert_eq!(parsed.rules.cooldown_after_delete, Duration::from_secs(60));
        assert_eq!(parsed.rules.owner_demotion, OwnerDemotion::Penultimate);
        assert!(parsed.metadata.is_empty());
    }
}
