use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineThresholds;
use crate::domain::game_log::{mean, stat_samples, GameLogEntry};
use crate::domain::player::PlayerId;
use crate::whatif::{stat_adjustment_in_range, WhatIfModification};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeammateLog {
    pub player_id: PlayerId,
    pub player_name: String,
    #[serde(default)]
    pub game_logs: Vec<GameLogEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactDirection {
    Boost,
    Drop,
    Neutral,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeammateImpact {
    pub player_id: PlayerId,
    pub player_name: String,
    pub with_games: usize,
    pub without_games: usize,
    pub with_avg: f64,
    pub without_avg: f64,
    /// `without_avg - with_avg`.
    pub delta: f64,
    pub pct_change: f64,
    pub direction: ImpactDirection,
}

impl TeammateImpact {
    /// The impact expressed as a stat adjustment for the what-if simulator,
    /// or `None` when it falls outside the simulator's accepted range.
    pub fn as_modification(&self) -> Option<WhatIfModification> {
        let pct = self.pct_change;
        stat_adjustment_in_range(pct).then_some(WhatIfModification::StatAdjustment { pct })
    }
}

/// How each teammate's production moves when the absent player sits.
///
/// `player_game_dates` are the dates the absent player appeared. A teammate
/// game on one of those dates counts as "with", any other as "without".
/// Teammates short of either minimum are left out. Results are ordered by
/// the size of the swing.
pub fn teammate_absence_impact(
    player_game_dates: &[NaiveDate],
    teammates: &[TeammateLog],
    stat: &str,
    thresholds: &EngineThresholds,
) -> Vec<TeammateImpact> {
    let played: BTreeSet<NaiveDate> = player_game_dates.iter().copied().collect();

    let mut impacts: Vec<TeammateImpact> = teammates
        .iter()
        .filter_map(|teammate| {
            let (with, without): (Vec<_>, Vec<_>) = stat_samples(&teammate.game_logs, stat)
                .into_iter()
                .partition(|sample| played.contains(&sample.entry.date));

            if with.len() < thresholds.teammate_min_with
                || without.len() < thresholds.teammate_min_without
            {
                debug!(
                    event_name = "engine.teammate_impact.skipped",
                    player_id = %teammate.player_id,
                    with_games = with.len(),
                    without_games = without.len(),
                    "teammate sample too small for absence impact"
                );
                return None;
            }

            let with_avg = mean(with.iter().map(|sample| sample.value))?;
            let without_avg = mean(without.iter().map(|sample| sample.value))?;
            let delta = without_avg - with_avg;
            let pct_change = if with_avg.abs() > f64::EPSILON { delta / with_avg * 100.0 } else { 0.0 };
            let direction = if delta > thresholds.impact_dead_zone {
                ImpactDirection::Boost
            } else if delta < -thresholds.impact_dead_zone {
                ImpactDirection::Drop
            } else {
                ImpactDirection::Neutral
            };

            Some(TeammateImpact {
                player_id: teammate.player_id.clone(),
                player_name: teammate.player_name.clone(),
                with_games: with.len(),
                without_games: without.len(),
                with_avg,
                without_avg,
                delta,
                pct_change,
                direction,
            })
        })
        .collect();

    impacts.sort_by(|left, right| {
        right
            .delta
            .abs()
            .partial_cmp(&left.delta.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.player_name.cmp(&right.player_name))
    });
    impacts
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::config::EngineThresholds;
    use crate::domain::player::PlayerId;
    use crate::test_support::entry;
    use crate::whatif::{WhatIfModification, MAX_STAT_ADJUSTMENT_PCT, MIN_STAT_ADJUSTMENT_PCT};

    use super::{teammate_absence_impact, ImpactDirection, TeammateImpact, TeammateLog};

    fn teammate(name: &str, games: &[(i64, f64)]) -> TeammateLog {
        TeammateLog {
            player_id: PlayerId(name.to_ascii_lowercase()),
            player_name: name.to_string(),
            game_logs: games.iter().map(|(days_ago, value)| entry("points", *value, *days_ago)).collect(),
        }
    }

    fn dates(days_ago: &[i64]) -> Vec<NaiveDate> {
        let base = crate::test_support::game_date();
        days_ago.iter().map(|days| base - Duration::days(*days)).collect()
    }

    #[test]
    fn usage_bump_is_a_boost() {
        let played = dates(&[1, 3, 5]);
        let logs = teammate("Backup Guard", &[(1, 10.0), (3, 12.0), (5, 11.0), (7, 18.0), (9, 16.0)]);

        let impacts =
            teammate_absence_impact(&played, &[logs], "points", &EngineThresholds::default());
        assert_eq!(impacts.len(), 1);

        let impact = &impacts[0];
        assert_eq!((impact.with_games, impact.without_games), (3, 2));
        assert!((impact.with_avg - 11.0).abs() < 1e-12);
        assert!((impact.without_avg - 17.0).abs() < 1e-12);
        assert!((impact.delta - 6.0).abs() < 1e-12);
        assert!((impact.pct_change - 6.0 / 11.0 * 100.0).abs() < 1e-9);
        assert_eq!(impact.direction, ImpactDirection::Boost);
        assert!(matches!(
            impact.as_modification(),
            Some(WhatIfModification::StatAdjustment { .. })
        ));
    }

    #[test]
    fn short_with_sample_is_omitted() {
        let played = dates(&[1, 3]);
        let logs = teammate("Wing", &[(1, 10.0), (3, 12.0), (5, 11.0), (7, 18.0), (9, 16.0), (11, 9.0)]);

        let impacts =
            teammate_absence_impact(&played, &[logs], "points", &EngineThresholds::default());
        assert!(impacts.is_empty());
    }

    #[test]
    fn dead_zone_and_zero_baseline() {
        let played = dates(&[1, 3, 5]);
        let steady = teammate("Steady", &[(1, 10.0), (3, 10.0), (5, 10.0), (7, 10.4), (9, 10.2)]);
        let idle = teammate("Idle", &[(1, 0.0), (3, 0.0), (5, 0.0), (7, 4.0), (9, 2.0)]);

        let impacts = teammate_absence_impact(
            &played,
            &[steady, idle],
            "points",
            &EngineThresholds::default(),
        );
        assert_eq!(impacts.len(), 2);
        assert_eq!(impacts[0].player_name, "Idle");
        assert_eq!(impacts[0].pct_change, 0.0);
        assert_eq!(impacts[1].direction, ImpactDirection::Neutral);
    }

    #[test]
    fn suggested_adjustment_shares_simulator_bounds() {
        let impact = |pct_change: f64| TeammateImpact {
            player_id: PlayerId("t-1".to_string()),
            player_name: "Sixth Man".to_string(),
            with_games: 5,
            without_games: 3,
            with_avg: 10.0,
            without_avg: 10.0 * (1.0 + pct_change / 100.0),
            delta: pct_change / 10.0,
            pct_change,
            direction: ImpactDirection::Boost,
        };

        assert_eq!(
            impact(MAX_STAT_ADJUSTMENT_PCT).as_modification(),
            Some(WhatIfModification::StatAdjustment { pct: MAX_STAT_ADJUSTMENT_PCT })
        );
        assert_eq!(impact(MAX_STAT_ADJUSTMENT_PCT + 0.5).as_modification(), None);
        assert_eq!(impact(MIN_STAT_ADJUSTMENT_PCT).as_modification(), None);
        assert!(impact(-99.0).as_modification().is_some());
        assert_eq!(impact(f64::NAN).as_modification(), None);
    }
}
