use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Scoring conditions understood by the scoring service. The set is closed;
/// only the points attached to each condition are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKey {
    OpponentTwoPlusHigher,
    OpponentOneHigher,
    OpponentEqual,
    OpponentOneLower,
    OpponentTwoPlusLower,
    ThreeStarsUp,
    ThreeStarsEven,
    ThreeStarsDown,
    TwoStarsAbove90,
    TwoStars80To89,
    TwoStars50To79,
    OneStar90To99,
    OneStar50To89,
    AttackMade,
    Perfect100,
    CourageBase,
    CourageExtra,
    AllAttacks,
}

impl RuleKey {
    pub const ALL: [RuleKey; 18] = [
        RuleKey::OpponentTwoPlusHigher,
        RuleKey::OpponentOneHigher,
        RuleKey::OpponentEqual,
        RuleKey::OpponentOneLower,
        RuleKey::OpponentTwoPlusLower,
        RuleKey::ThreeStarsUp,
        RuleKey::ThreeStarsEven,
        RuleKey::ThreeStarsDown,
        RuleKey::TwoStarsAbove90,
        RuleKey::TwoStars80To89,
        RuleKey::TwoStars50To79,
        RuleKey::OneStar90To99,
        RuleKey::OneStar50To89,
        RuleKey::AttackMade,
        RuleKey::Perfect100,
        RuleKey::CourageBase,
        RuleKey::CourageExtra,
        RuleKey::AllAttacks,
    ];

    /// Key name in the scoring service's point system.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKey::OpponentTwoPlusHigher => "ell_gt_2",
            RuleKey::OpponentOneHigher => "ell_eq_1",
            RuleKey::OpponentEqual => "ell_eq_0",
            RuleKey::OpponentOneLower => "ell_eq_-1",
            RuleKey::OpponentTwoPlusLower => "ell_lt_-2",
            RuleKey::ThreeStarsUp => "atk_3s_gt_2",
            RuleKey::ThreeStarsEven => "atk_3s_eq",
            RuleKey::ThreeStarsDown => "atk_3s_lt_-2",
            RuleKey::TwoStarsAbove90 => "atk_2s_ge_90",
            RuleKey::TwoStars80To89 => "atk_2s_80_89",
            RuleKey::TwoStars50To79 => "atk_2s_50_79",
            RuleKey::OneStar90To99 => "atk_1s_90_99",
            RuleKey::OneStar50To89 => "atk_1s_50_89",
            RuleKey::AttackMade => "aktiv",
            RuleKey::Perfect100 => "bonus_100",
            RuleKey::CourageBase => "mut_base",
            RuleKey::CourageExtra => "mut_extra",
            RuleKey::AllAttacks => "all_attacks",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        RuleKey::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn description(&self) -> &'static str {
        match self {
            RuleKey::OpponentTwoPlusHigher => "Opponent 2+ levels higher",
            RuleKey::OpponentOneHigher => "Opponent 1 level higher",
            RuleKey::OpponentEqual => "Opponent same level",
            RuleKey::OpponentOneLower => "Opponent 1 level lower",
            RuleKey::OpponentTwoPlusLower => "Opponent 2+ levels lower",
            RuleKey::ThreeStarsUp => "3 stars vs 2+ levels higher",
            RuleKey::ThreeStarsEven => "3 stars vs within 1 level",
            RuleKey::ThreeStarsDown => "3 stars vs 2+ levels lower",
            RuleKey::TwoStarsAbove90 => "2 stars, 90% or more",
            RuleKey::TwoStars80To89 => "2 stars, 80-89%",
            RuleKey::TwoStars50To79 => "2 stars, 50-79%",
            RuleKey::OneStar90To99 => "1 star, 90-99%",
            RuleKey::OneStar50To89 => "1 star, 50-89%",
            RuleKey::AttackMade => "Attack made",
            RuleKey::Perfect100 => "100% vs same or higher level",
            RuleKey::CourageBase => "Courage: opponent 3+ higher",
            RuleKey::CourageExtra => "Courage with 30-49%",
            RuleKey::AllAttacks => "All 7 attacks made",
        }
    }

    pub fn default_points(&self) -> i64 {
        match self {
            RuleKey::OpponentTwoPlusHigher => 3,
            RuleKey::OpponentOneHigher => 2,
            RuleKey::OpponentEqual => 1,
            RuleKey::OpponentOneLower => 0,
            RuleKey::OpponentTwoPlusLower => -1,
            RuleKey::ThreeStarsUp => 6,
            RuleKey::ThreeStarsEven => 4,
            RuleKey::ThreeStarsDown => 2,
            RuleKey::TwoStarsAbove90 => 4,
            RuleKey::TwoStars80To89 => 3,
            RuleKey::TwoStars50To79 => 2,
            RuleKey::OneStar90To99 => 2,
            RuleKey::OneStar50To89 => 1,
            RuleKey::AttackMade => 1,
            RuleKey::Perfect100 => 1,
            RuleKey::CourageBase => 1,
            RuleKey::CourageExtra => 2,
            RuleKey::AllAttacks => 2,
        }
    }
}

/// Points per scoring condition. Always holds a value for every [`RuleKey`].
///
/// Serialized as the service's flat `{key: points}` object. Deserializing
/// fills missing keys from the defaults and drops unknown ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, i64>", into = "BTreeMap<String, i64>")]
pub struct RuleTable {
    points: BTreeMap<RuleKey, i64>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            points: RuleKey::ALL
                .into_iter()
                .map(|k| (k, k.default_points()))
                .collect(),
        }
    }
}

impl RuleTable {
    pub fn get(&self, key: RuleKey) -> i64 {
        self.points
            .get(&key)
            .copied()
            .unwrap_or_else(|| key.default_points())
    }

    pub fn set(&mut self, key: RuleKey, points: i64) {
        self.points.insert(key, points);
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleKey, i64)> + '_ {
        self.points.iter().map(|(k, v)| (*k, *v))
    }

    /// Keys whose value differs from the built-in default.
    pub fn overrides(&self) -> Vec<RuleKey> {
        self.iter()
            .filter(|(k, v)| *v != k.default_points())
            .map(|(k, _)| k)
            .collect()
    }
}

impl From<BTreeMap<String, i64>> for RuleTable {
    fn from(raw: BTreeMap<String, i64>) -> Self {
        let mut table = RuleTable::default();
        for (key, points) in raw {
            match RuleKey::from_str(&key) {
                Some(k) => table.set(k, points),
                None => warn!("Dropping unknown rule key {:?}", key),
            }
        }
        table
    }
}

impl From<RuleTable> for BTreeMap<String, i64> {
    fn from(table: RuleTable) -> Self {
        table
            .points
            .into_iter()
            .map(|(k, v)| (k.as_str().to_string(), v))
            .collect()
    }
}
