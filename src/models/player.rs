use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use super::{CwlError, Result};

/// Number of rounds in one league.
pub const LEAGUE_DAYS: usize = 7;

const NAME_KEY: &str = "Name";
const OWN_TOWN_HALL_KEY: &str = "Eigenes_Rathaus";

/// A single editable numeric slot of a player record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    OwnTownHall,
    OpponentTownHall(usize),
    Stars(usize),
    Destruction(usize),
}

impl Field {
    /// All 22 slots in table order: own level, then opponent levels, stars and
    /// destruction for days 1..=7.
    pub fn all() -> Vec<Field> {
        let mut fields = Vec::with_capacity(1 + 3 * LEAGUE_DAYS);
        fields.push(Field::OwnTownHall);
        fields.extend((1..=LEAGUE_DAYS).map(Field::OpponentTownHall));
        fields.extend((1..=LEAGUE_DAYS).map(Field::Stars));
        fields.extend((1..=LEAGUE_DAYS).map(Field::Destruction));
        fields
    }

    pub fn day(&self) -> Option<usize> {
        match self {
            Field::OwnTownHall => None,
            Field::OpponentTownHall(d) | Field::Stars(d) | Field::Destruction(d) => Some(*d),
        }
    }

    /// Key used by the scoring service and the persisted roster.
    pub fn wire_key(&self) -> String {
        match self {
            Field::OwnTownHall => OWN_TOWN_HALL_KEY.to_string(),
            Field::OpponentTownHall(d) => format!("Tag{}_Rathaus_Gegner", d),
            Field::Stars(d) => format!("Tag{}_Sterne", d),
            Field::Destruction(d) => format!("Tag{}_Prozent", d),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Field::OwnTownHall => "Own TH".to_string(),
            Field::OpponentTownHall(d) => format!("Day {} opp TH", d),
            Field::Stars(d) => format!("Day {} stars", d),
            Field::Destruction(d) => format!("Day {} %", d),
        }
    }

    /// Accepts wire keys (`Tag3_Sterne`) as well as the short forms `own`,
    /// `opp3`, `stars3` and `pct3`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == OWN_TOWN_HALL_KEY || s.eq_ignore_ascii_case("own") {
            return Some(Field::OwnTownHall);
        }

        let (kind, day) = if let Some(rest) = s.strip_prefix("Tag") {
            let (day, kind) = rest.split_once('_')?;
            let kind = match kind {
                "Rathaus_Gegner" => "opp",
                "Sterne" => "stars",
                "Prozent" => "pct",
                _ => return None,
            };
            (kind, day)
        } else {
            let split = s.find(|c: char| c.is_ascii_digit())?;
            let (kind, day) = s.split_at(split);
            (kind, day)
        };

        let day: usize = day.parse().ok()?;
        if !(1..=LEAGUE_DAYS).contains(&day) {
            return None;
        }

        match kind.to_ascii_lowercase().as_str() {
            "opp" => Some(Field::OpponentTownHall(day)),
            "stars" => Some(Field::Stars(day)),
            "pct" => Some(Field::Destruction(day)),
            _ => None,
        }
    }
}

/// Coerces a loosely typed input value to a known integer.
///
/// Integers and numeric strings are kept (including `0`), floats go through
/// [`coerce_float`]; everything else, `null` included, is unknown.
pub fn coerce_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(coerce_float)),
        Value::String(s) => parse_entry(s),
        _ => None,
    }
}

/// Fractional values such as a destruction of `87.5` are truncated toward
/// zero. Every acquisition path goes through here.
pub fn coerce_float(value: f64) -> Option<i64> {
    value.is_finite().then(|| value.trunc() as i64)
}

/// Parses a manually typed cell. Empty or non-integer text is unknown.
pub fn parse_entry(input: &str) -> Option<i64> {
    input.trim().parse::<i64>().ok()
}

/// One league day of a raw roster entry; any slot may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDay {
    pub opponent_town_hall_level: Option<i64>,
    pub stars: Option<i64>,
    pub destruction_percent: Option<i64>,
}

/// Per-player league data as delivered by an acquisition source. Days are
/// sparse: only days the source knows something about are present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlayer {
    pub name: String,
    pub own_town_hall_level: Option<i64>,
    pub days: BTreeMap<usize, RawDay>,
}

impl RawPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn day_mut(&mut self, day: usize) -> &mut RawDay {
        self.days.entry(day).or_default()
    }

    pub fn has_attack(&self) -> bool {
        self.days.values().any(|d| d.stars.is_some())
    }

    fn set(&mut self, field: Field, value: Option<i64>) {
        match field {
            Field::OwnTownHall => self.own_town_hall_level = value,
            Field::OpponentTownHall(d) => self.day_mut(d).opponent_town_hall_level = value,
            Field::Stars(d) => self.day_mut(d).stars = value,
            Field::Destruction(d) => self.day_mut(d).destruction_percent = value,
        }
    }
}

impl<'de> Deserialize<'de> for RawPlayer {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, Value>::deserialize(deserializer)?;

        let name = match map.get(NAME_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(de::Error::missing_field(NAME_KEY)),
        };

        let mut player = RawPlayer::new(name);
        for (key, value) in &map {
            if key == NAME_KEY {
                continue;
            }
            match Field::parse(key) {
                Some(field) => player.set(field, coerce_value(value)),
                None => warn!("Ignoring unknown roster key {:?} for {}", key, player.name),
            }
        }
        Ok(player)
    }
}

/// One league day of a normalized record; every slot is present, `None`
/// meaning unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayResult {
    pub opponent_town_hall_level: Option<i64>,
    pub stars: Option<i64>,
    pub destruction_percent: Option<i64>,
}

/// A fully shaped player record: own level plus all seven day slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub own_town_hall_level: Option<i64>,
    pub days: [DayResult; LEAGUE_DAYS],
}

impl PlayerRecord {
    /// A record with only a name; every numeric slot unknown.
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            own_town_hall_level: None,
            days: [DayResult::default(); LEAGUE_DAYS],
        }
    }

    /// `day` is 1-based.
    pub fn day(&self, day: usize) -> Option<&DayResult> {
        day.checked_sub(1).and_then(|i| self.days.get(i))
    }

    pub fn get(&self, field: Field) -> Option<i64> {
        match field {
            Field::OwnTownHall => self.own_town_hall_level,
            Field::OpponentTownHall(d) => self.day(d)?.opponent_town_hall_level,
            Field::Stars(d) => self.day(d)?.stars,
            Field::Destruction(d) => self.day(d)?.destruction_percent,
        }
    }

    /// Returns false when `field` names a day outside the league.
    pub fn set(&mut self, field: Field, value: Option<i64>) -> bool {
        let slot = match field {
            Field::OwnTownHall => Some(&mut self.own_town_hall_level),
            Field::OpponentTownHall(d) => self.day_mut(d).map(|s| &mut s.opponent_town_hall_level),
            Field::Stars(d) => self.day_mut(d).map(|s| &mut s.stars),
            Field::Destruction(d) => self.day_mut(d).map(|s| &mut s.destruction_percent),
        };
        match slot {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn day_mut(&mut self, day: usize) -> Option<&mut DayResult> {
        day.checked_sub(1).and_then(|i| self.days.get_mut(i))
    }
}

impl From<RawPlayer> for PlayerRecord {
    fn from(raw: RawPlayer) -> Self {
        let mut record = PlayerRecord::blank(raw.name);
        record.own_town_hall_level = raw.own_town_hall_level;
        for (day, slots) in raw.days {
            let Some(target) = day.checked_sub(1).and_then(|i| record.days.get_mut(i)) else {
                warn!("Dropping data for day {} of {}: outside the league", day, record.name);
                continue;
            };
            *target = DayResult {
                opponent_town_hall_level: slots.opponent_town_hall_level,
                stars: slots.stars,
                destruction_percent: slots.destruction_percent,
            };
        }
        record
    }
}

impl Serialize for PlayerRecord {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fields = Field::all();
        let mut map = serializer.serialize_map(Some(1 + fields.len()))?;
        map.serialize_entry(NAME_KEY, &self.name)?;
        for field in fields {
            map.serialize_entry(&field.wire_key(), &self.get(field))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PlayerRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawPlayer::deserialize(deserializer).map(PlayerRecord::from)
    }
}

/// The players of one report run, unique by name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    players: Vec<PlayerRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster keeping the first record for each name.
    pub fn from_records(records: impl IntoIterator<Item = PlayerRecord>) -> Self {
        let mut roster = Roster::new();
        for record in records {
            if roster.get(&record.name).is_some() {
                warn!("Duplicate player {} in roster, keeping the first entry", record.name);
                continue;
            }
            roster.players.push(record);
        }
        roster
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|p| p.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn set_field(&mut self, name: &str, field: Field, value: Option<i64>) -> Result<()> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| CwlError::UnknownPlayer(name.to_string()))?;
        if !player.set(field, value) {
            return Err(CwlError::Config(format!("no such field: {:?}", field)));
        }
        Ok(())
    }
}

impl Serialize for Roster {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.players.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<PlayerRecord>::deserialize(deserializer).map(Roster::from_records)
    }
}
