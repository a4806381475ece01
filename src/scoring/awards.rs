use crate::models::{Award, Awards, PlayerRecord, Roster, ScoreResult};

/// Winner name when the result list is empty.
pub const NO_WINNER: &str = "no winner";
/// Winner name when nobody attacked a much stronger opponent.
pub const NO_ONE: &str = "no one";

/// An opponent must be at least this many levels above the attacker.
const UNDERDOG_LEVEL_GAP: i64 = 2;
const UNDERDOG_POINTS_PER_STAR: i64 = 2;

/// Derives the superlatives of one scoring run. Pure; recomputed from scratch
/// on every call.
pub fn derive_awards(roster: &Roster, results: &[ScoreResult]) -> Awards {
    Awards {
        top_scorer: top_scorer(results),
        underdog: underdog(roster),
    }
}

/// Highest total; ties go to the earliest entry in `results`.
pub fn top_scorer(results: &[ScoreResult]) -> Award {
    let best = results.iter().fold(None::<&ScoreResult>, |best, r| match best {
        Some(b) if b.total_points >= r.total_points => Some(b),
        _ => Some(r),
    });

    match best {
        Some(r) => Award {
            winner_name: r.name.clone(),
            label: format!("{} points", r.total_points),
            points: r.total_points,
        },
        None => Award {
            winner_name: NO_WINNER.to_string(),
            label: "0 points".to_string(),
            points: 0,
        },
    }
}

/// "David vs. Goliath": two points per star earned against an opponent at
/// least two levels higher. Ties go to the earliest player in the roster; a
/// best score of zero means nobody wins.
pub fn underdog(roster: &Roster) -> Award {
    let mut winner: Option<(&str, i64)> = None;
    for player in roster.iter() {
        let score = underdog_score(player);
        if score > winner.map(|(_, s)| s).unwrap_or(0) {
            winner = Some((player.name.as_str(), score));
        }
    }

    match winner {
        Some((name, score)) => Award {
            winner_name: name.to_string(),
            label: format!("{} points against higher town halls", score),
            points: score,
        },
        None => Award {
            winner_name: NO_ONE.to_string(),
            label: "No attacks on much higher town halls".to_string(),
            points: 0,
        },
    }
}

/// A day counts only when both levels are known and positive and the
/// opponent is at least two levels higher. Unknown stars count as zero.
///
/// Values are typed in by hand, so the arithmetic saturates instead of
/// overflowing.
pub fn underdog_score(player: &PlayerRecord) -> i64 {
    let Some(own) = player.own_town_hall_level.filter(|l| *l > 0) else {
        return 0;
    };
    // No level can be two above the largest one.
    let Some(threshold) = own.checked_add(UNDERDOG_LEVEL_GAP) else {
        return 0;
    };

    player
        .days
        .iter()
        .filter(|day| {
            day.opponent_town_hall_level
                .is_some_and(|opp| opp > 0 && opp >= threshold)
        })
        .map(|day| day.stars.unwrap_or(0).saturating_mul(UNDERDOG_POINTS_PER_STAR))
        .fold(0i64, i64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    fn player(name: &str, own: Option<i64>, days: &[(usize, Option<i64>, Option<i64>)]) -> PlayerRecord {
        let mut record = PlayerRecord::blank(name);
        record.own_town_hall_level = own;
        for (day, opp, stars) in days {
            record.set(Field::OpponentTownHall(*day), *opp);
            record.set(Field::Stars(*day), *stars);
        }
        record
    }

    #[test]
    fn test_scenario_top_scorer_and_underdog_differ() {
        let roster = Roster::from_records(vec![
            player("A", Some(10), &[(1, Some(13), Some(3))]),
            player("B", Some(12), &[(1, Some(12), Some(3)), (2, Some(13), Some(2))]),
        ]);
        let results = vec![ScoreResult::new("A", 50), ScoreResult::new("B", 80)];

        let awards = derive_awards(&roster, &results);
        assert_eq!(awards.top_scorer.winner_name, "B");
        assert_eq!(awards.top_scorer.points, 80);
        assert_eq!(awards.underdog.winner_name, "A");
        assert_eq!(awards.underdog.points, 6);
    }

    #[test]
    fn test_no_qualifying_days_means_no_one() {
        let roster = Roster::from_records(vec![
            player("A", Some(10), &[(1, Some(11), Some(3))]),
            player("B", None, &[(1, Some(15), Some(3))]),
        ]);
        let award = underdog(&roster);
        assert_eq!(award.winner_name, NO_ONE);
        assert_eq!(award.points, 0);
    }

    #[test]
    fn test_empty_results_yield_sentinel() {
        let award = top_scorer(&[]);
        assert_eq!(award.winner_name, NO_WINNER);
        assert_eq!(award.points, 0);
    }

    #[test]
    fn test_top_scorer_tie_goes_to_first_result() {
        let results = vec![
            ScoreResult::new("X", 10),
            ScoreResult::new("Y", 30),
            ScoreResult::new("Z", 30),
        ];
        assert_eq!(top_scorer(&results).winner_name, "Y");
    }

    #[test]
    fn test_top_scorer_handles_negative_totals() {
        let results = vec![ScoreResult::new("X", -4), ScoreResult::new("Y", -2)];
        assert_eq!(top_scorer(&results).winner_name, "Y");
    }

    #[test]
    fn test_underdog_tie_goes_to_first_roster_entry() {
        let roster = Roster::from_records(vec![
            player("First", Some(9), &[(2, Some(11), Some(2))]),
            player("Second", Some(9), &[(5, Some(12), Some(2))]),
        ]);
        assert_eq!(underdog(&roster).winner_name, "First");
    }

    #[test]
    fn test_underdog_score_rules() {
        // exactly two higher counts, one higher does not
        let p = player("P", Some(10), &[(1, Some(12), Some(2)), (2, Some(11), Some(3))]);
        assert_eq!(underdog_score(&p), 4);

        // unknown opponent never counts
        let p = player("P", Some(10), &[(1, None, Some(3))]);
        assert_eq!(underdog_score(&p), 0);

        // unknown stars count as zero
        let p = player("P", Some(10), &[(1, Some(14), None)]);
        assert_eq!(underdog_score(&p), 0);

        // non-positive own level is never eligible
        let p = player("P", Some(0), &[(1, Some(5), Some(3))]);
        assert_eq!(underdog_score(&p), 0);
        let p = player("P", None, &[(1, Some(5), Some(3))]);
        assert_eq!(underdog_score(&p), 0);
    }

    #[test]
    fn test_underdog_score_extreme_values_saturate() {
        // nothing can be two levels above the largest own level
        let p = player("P", Some(i64::MAX), &[(1, Some(5), Some(3))]);
        assert_eq!(underdog_score(&p), 0);
        let p = player("P", Some(i64::MAX - 1), &[(1, Some(i64::MAX), Some(3))]);
        assert_eq!(underdog_score(&p), 0);

        let p = player("P", Some(10), &[(1, Some(13), Some(i64::MAX))]);
        assert_eq!(underdog_score(&p), i64::MAX);

        let p = player(
            "P",
            Some(10),
            &[(1, Some(13), Some(i64::MAX / 2)), (2, Some(14), Some(i64::MAX / 2))],
        );
        assert_eq!(underdog_score(&p), i64::MAX);

        let p = player("P", Some(10), &[(1, Some(13), Some(i64::MIN))]);
        assert_eq!(underdog_score(&p), i64::MIN);
    }

    #[test]
    fn test_underdog_with_huge_entries_still_picks_a_winner() {
        let roster = Roster::from_records(vec![
            player("Huge", Some(i64::MAX), &[(1, Some(5), Some(3))]),
            player("Real", Some(9), &[(1, Some(11), Some(i64::MAX))]),
        ]);
        let award = underdog(&roster);
        assert_eq!(award.winner_name, "Real");
        assert_eq!(award.points, i64::MAX);
    }

    #[test]
    fn test_underdog_score_monotonic_in_stars() {
        let mut previous = -1;
        for stars in 0..=3 {
            let p = player("P", Some(8), &[(1, Some(10), Some(stars)), (3, Some(11), Some(1))]);
            let score = underdog_score(&p);
            assert!(score >= previous);
            previous = score;
        }
        assert_eq!(previous, 8);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let roster = Roster::from_records(vec![
            player("A", Some(10), &[(1, Some(13), Some(3))]),
            player("B", Some(11), &[(6, Some(13), Some(1))]),
        ]);
        let results = vec![ScoreResult::new("A", 20), ScoreResult::new("B", 20)];
        assert_eq!(derive_awards(&roster, &results), derive_awards(&roster, &results));
    }
}
