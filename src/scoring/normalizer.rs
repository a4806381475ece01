use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{PlayerRecord, RawPlayer, Roster};

/// How much of the acquired data is carried into the editable roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillPolicy {
    /// Keep only player names; everything else is entered by hand.
    pub manual_entry_only: bool,
    /// Keep results but leave opponent levels for manual entry. Ignored when
    /// `manual_entry_only` is set.
    pub skip_opponent_town_hall: bool,
}

/// Turns raw acquired data into a fully shaped roster.
///
/// The output holds one record per distinct input name. Every record has all
/// day slots; a slot is unknown when the source did not supply it or the
/// policy discarded it. A supplied `0` stays `0`.
pub fn normalize(raw: &[RawPlayer], policy: FillPolicy) -> Roster {
    info!(
        "Normalizing {} players (manual entry only: {}, skip opponent TH: {})",
        raw.len(),
        policy.manual_entry_only,
        policy.skip_opponent_town_hall
    );
    Roster::from_records(raw.iter().map(|p| normalize_player(p, policy)))
}

fn normalize_player(raw: &RawPlayer, policy: FillPolicy) -> PlayerRecord {
    if policy.manual_entry_only {
        return PlayerRecord::blank(raw.name.clone());
    }

    let mut record = PlayerRecord::from(raw.clone());
    if policy.skip_opponent_town_hall {
        for day in record.days.iter_mut() {
            day.opponent_town_hall_level = None;
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, LEAGUE_DAYS};

    fn raw_player(name: &str) -> RawPlayer {
        let mut raw = RawPlayer::new(name);
        raw.own_town_hall_level = Some(12);
        let day = raw.day_mut(1);
        day.opponent_town_hall_level = Some(14);
        day.stars = Some(3);
        day.destruction_percent = Some(100);
        let day = raw.day_mut(4);
        day.opponent_town_hall_level = Some(11);
        day.stars = Some(0);
        day.destruction_percent = Some(0);
        raw
    }

    fn key_count(record: &PlayerRecord) -> usize {
        serde_json::to_value(record)
            .unwrap()
            .as_object()
            .map(|m| m.len())
            .unwrap_or(0)
    }

    #[test]
    fn test_default_policy_keeps_everything() {
        let roster = normalize(&[raw_player("Alice")], FillPolicy::default());
        let alice = roster.get("Alice").unwrap();

        assert_eq!(alice.own_town_hall_level, Some(12));
        assert_eq!(alice.get(Field::OpponentTownHall(1)), Some(14));
        assert_eq!(alice.get(Field::Stars(1)), Some(3));
        assert_eq!(alice.get(Field::Destruction(1)), Some(100));
        assert_eq!(alice.get(Field::Stars(2)), None);
        assert_eq!(key_count(alice), 23);
    }

    #[test]
    fn test_zero_survives_normalization() {
        let mut raw = raw_player("Bob");
        raw.own_town_hall_level = Some(0);
        let roster = normalize(&[raw], FillPolicy::default());
        let bob = roster.get("Bob").unwrap();

        assert_eq!(bob.own_town_hall_level, Some(0));
        assert_eq!(bob.get(Field::Stars(4)), Some(0));
        assert_eq!(bob.get(Field::Destruction(4)), Some(0));
    }

    #[test]
    fn test_manual_entry_keeps_only_names() {
        let policy = FillPolicy {
            manual_entry_only: true,
            skip_opponent_town_hall: false,
        };
        let roster = normalize(&[raw_player("Alice"), raw_player("Bob")], policy);

        assert_eq!(roster.len(), 2);
        for player in roster.iter() {
            assert_eq!(player, &PlayerRecord::blank(player.name.clone()));
            assert_eq!(key_count(player), 23);
        }
    }

    #[test]
    fn test_manual_entry_takes_precedence() {
        let policy = FillPolicy {
            manual_entry_only: true,
            skip_opponent_town_hall: true,
        };
        let roster = normalize(&[raw_player("Alice")], policy);
        assert_eq!(roster.get("Alice"), Some(&PlayerRecord::blank("Alice")));
    }

    #[test]
    fn test_skip_opponent_level_clears_only_opponents() {
        let policy = FillPolicy {
            manual_entry_only: false,
            skip_opponent_town_hall: true,
        };
        let roster = normalize(&[raw_player("Alice")], policy);
        let alice = roster.get("Alice").unwrap();

        for day in 1..=LEAGUE_DAYS {
            assert_eq!(alice.get(Field::OpponentTownHall(day)), None);
        }
        assert_eq!(alice.own_town_hall_level, Some(12));
        assert_eq!(alice.get(Field::Stars(1)), Some(3));
        assert_eq!(alice.get(Field::Destruction(4)), Some(0));
    }

    #[test]
    fn test_output_names_match_input() {
        let raw = vec![raw_player("A"), RawPlayer::new("B"), raw_player("A"), RawPlayer::new("C")];
        let roster = normalize(&raw, FillPolicy::default());
        assert_eq!(roster.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_days_outside_league_are_dropped() {
        let mut raw = RawPlayer::new("Dora");
        raw.day_mut(9).stars = Some(3);
        raw.day_mut(0).stars = Some(3);
        let roster = normalize(&[raw], FillPolicy::default());
        assert_eq!(roster.get("Dora"), Some(&PlayerRecord::blank("Dora")));
    }
}
