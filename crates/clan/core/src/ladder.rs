//! Membership level ladder.
//!
//! Games describe their ranks as an open JSON object (`{"member": 1, "elder": 2}`).
//! [`Ladder`] is the validated, ascending form of that object; every rule that
//! compares ranks or moves a member up or down goes through it.

use serde_json::{Map, Value};

/// Raw level document as supplied by a game: level name to integer rank.
pub type LevelMap = Map<String, Value>;

/// One named rank on the ladder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Level {
    pub name: String,
    pub rank: i64,
}

/// Reasons a level document cannot be turned into a ladder.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvalidLevels {
    #[error("membership levels must not be empty")]
    Empty,

    #[error("membership level '{name}' must map to an integer rank, got {value}")]
    NonIntegerRank { name: String, value: String },

    #[error("membership levels '{first}' and '{second}' share rank {rank}")]
    DuplicateRank {
        rank: i64,
        first: String,
        second: String,
    },

    #[error("a game needs at least {required} membership levels, got {actual}")]
    TooFew { required: usize, actual: usize },
}

/// Ascending sequence of levels with unique ranks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ladder {
    levels: Vec<Level>,
}

impl Ladder {
    /// Minimum number of levels a game ladder must define.
    pub const MIN_GAME_LEVELS: usize = 2;

    /// Parses and sorts a level document.
    pub fn from_map(levels: &LevelMap) -> Result<Self, InvalidLevels> {
        let mut parsed = Vec::with_capacity(levels.len());
        for (name, value) in levels {
            let rank = value.as_i64().ok_or_else(|| InvalidLevels::NonIntegerRank {
                name: name.clone(),
                value: value.to_string(),
            })?;
            parsed.push(Level {
                name: name.clone(),
                rank,
            });
        }
        Self::from_levels(parsed)
    }

    /// Builds a ladder from already-typed (name, rank) pairs.
    pub fn from_ranks<I, S>(levels: I) -> Result<Self, InvalidLevels>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self::from_levels(
            levels
                .into_iter()
                .map(|(name, rank)| Level {
                    name: name.into(),
                    rank,
                })
                .collect(),
        )
    }

    fn from_levels(mut levels: Vec<Level>) -> Result<Self, InvalidLevels> {
        if levels.is_empty() {
            return Err(InvalidLevels::Empty);
        }

        // Name as secondary key keeps the duplicate report stable.
        levels.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));

        if let Some(pair) = levels.windows(2).find(|pair| pair[0].rank == pair[1].rank) {
            return Err(InvalidLevels::DuplicateRank {
                rank: pair[0].rank,
                first: pair[0].name.clone(),
                second: pair[1].name.clone(),
            });
        }

        Ok(Self { levels })
    }

    /// Rejects ladders too short to express promotion and ownership.
    pub fn require_game_ladder(self) -> Result<Self, InvalidLevels> {
        if self.levels.len() < Self::MIN_GAME_LEVELS {
            return Err(InvalidLevels::TooFew {
                required: Self::MIN_GAME_LEVELS,
                actual: self.levels.len(),
            });
        }
        Ok(self)
    }

    /// Levels in ascending rank order.
    pub fn sorted_levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn min_level(&self) -> &Level {
        &self.levels[0]
    }

    pub fn max_level(&self) -> &Level {
        &self.levels[self.levels.len() - 1]
    }

    /// Second-highest level, or the only level of a single-entry ladder.
    pub fn penultimate(&self) -> &Level {
        let index = self.levels.len().saturating_sub(2);
        &self.levels[index]
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains_rank(&self, rank: i64) -> bool {
        self.position(rank).is_some()
    }

    pub fn rank_of(&self, name: &str) -> Option<i64> {
        self.levels
            .iter()
            .find(|level| level.name == name)
            .map(|level| level.rank)
    }

    pub fn name_of(&self, rank: i64) -> Option<&str> {
        self.position(rank).map(|index| self.levels[index].name.as_str())
    }

    /// The level one step above `rank`, if `rank` is on the ladder and not the top.
    pub fn next_above(&self, rank: i64) -> Option<&Level> {
        let index = self.position(rank)?;
        self.levels.get(index + 1)
    }

    /// The level one step below `rank`, if `rank` is on the ladder and not the bottom.
    pub fn next_below(&self, rank: i64) -> Option<&Level> {
        let index = self.position(rank)?;
        index.checked_sub(1).map(|below| &self.levels[below])
    }

    /// Converts the ladder back into its JSON document form.
    pub fn to_map(&self) -> LevelMap {
        self.levels
            .iter()
            .map(|level| (level.name.clone(), Value::from(level.rank)))
            .collect()
    }

    fn position(&self, rank: i64) -> Option<usize> {
        self.levels
            .binary_search_by(|level| level.rank.cmp(&rank))
            .ok()
    }
}

/// Sorts a raw level document; the free-function form of [`Ladder::from_map`].
pub fn sorted_levels(levels: &LevelMap) -> Result<Vec<Level>, InvalidLevels> {
    Ladder::from_map(levels).map(|ladder| ladder.levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn level_map(value: Value) -> LevelMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn sorts_levels_by_rank() {
        let levels = level_map(json!({"leader": 10, "member": 1, "elder": 5}));
        let ladder = Ladder::from_map(&levels).unwrap();

        let names: Vec<_> = ladder.sorted_levels().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["member", "elder", "leader"]);
        assert_eq!(ladder.min_level().rank, 1);
        assert_eq!(ladder.max_level().rank, 10);
        assert_eq!(ladder.penultimate().name, "elder");
    }

    #[test]
    fn steps_skip_gaps_in_ranks() {
        let ladder = Ladder::from_ranks([("member", 1), ("elder", 5), ("leader", 10)]).unwrap();

        assert_eq!(ladder.next_above(1).map(|l| l.rank), Some(5));
        assert_eq!(ladder.next_below(10).map(|l| l.rank), Some(5));
        assert!(ladder.next_above(10).is_none());
        assert!(ladder.next_below(1).is_none());
        // Off-ladder ranks have no neighbours.
        assert!(ladder.next_above(3).is_none());
    }

    #[test]
    fn rejects_empty_documents() {
        assert_eq!(Ladder::from_map(&LevelMap::new()), Err(InvalidLevels::Empty));
    }

    #[test]
    fn rejects_duplicate_ranks() {
        let levels = level_map(json!({"member": 1, "recruit": 1, "leader": 2}));
        let err = Ladder::from_map(&levels).unwrap_err();
        assert_eq!(
            err,
            InvalidLevels::DuplicateRank {
                rank: 1,
                first: "member".into(),
                second: "recruit".into(),
            }
        );
    }

    #[test]
    fn rejects_non_integer_ranks() {
        let levels = level_map(json!({"member": "one", "leader": 2}));
        assert!(matches!(
            Ladder::from_map(&levels),
            Err(InvalidLevels::NonIntegerRank { name, .. }) if name == "member"
        ));

        let levels = level_map(json!({"member": 1.5}));
        assert!(matches!(
            Ladder::from_map(&levels),
            Err(InvalidLevels::NonIntegerRank { .. })
        ));
    }

    #[test]
    fn game_ladders_need_two_levels() {
        let ladder = Ladder::from_ranks([("solo", 1)]).unwrap();
        assert_eq!(ladder.penultimate().name, "solo");
        assert_eq!(
            ladder.require_game_ladder(),
            Err(InvalidLevels::TooFew {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn looks_up_names_and_ranks() {
        let ladder = Ladder::from_ranks([("member", 1), ("leader", 2)]).unwrap();
        assert_eq!(ladder.rank_of("leader"), Some(2));
        assert_eq!(ladder.rank_of("ghost"), None);
        assert_eq!(ladder.name_of(1), Some("member"));
        assert_eq!(ladder.name_of(7), None);
        assert_eq!(Ladder::from_map(&ladder.to_map()).unwrap(), ladder);
    }
}
