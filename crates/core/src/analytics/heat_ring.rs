use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::window::windowed_samples;
use crate::domain::game_log::GameLogEntry;

#[derive(Clone, Debug)]
pub struct HeatRingRequest<'a> {
    pub game_logs: &'a [GameLogEntry],
    pub stat: &'a str,
    pub line: f64,
    pub max_games: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatRingGame {
    pub date: NaiveDate,
    pub opponent: String,
    pub value: f64,
    pub hit: bool,
    pub margin: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatRingAggregates {
    pub hit_rate: f64,
    pub hit_count: usize,
    pub total_games: usize,
    /// Positive for consecutive hits ending at the latest game, negative for misses.
    pub streak: i32,
    pub avg_margin: f64,
    pub avg_value: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatRing {
    /// Most-recent-first.
    pub games: Vec<HeatRingGame>,
    pub aggregates: HeatRingAggregates,
}

pub fn compute_heat_ring(request: HeatRingRequest<'_>) -> HeatRing {
    let samples = windowed_samples(request.game_logs, request.stat, Some(request.max_games));
    let games: Vec<HeatRingGame> = samples
        .iter()
        .map(|sample| HeatRingGame {
            date: sample.entry.date,
            opponent: sample.entry.opponent.clone(),
            value: sample.value,
            hit: sample.value > request.line,
            margin: sample.value - request.line,
        })
        .collect();

    if games.is_empty() {
        return HeatRing::default();
    }

    let total_games = games.len();
    let hit_count = games.iter().filter(|game| game.hit).count();
    let total_value: f64 = games.iter().map(|game| game.value).sum();
    let total_margin: f64 = games.iter().map(|game| game.margin).sum();

    let aggregates = HeatRingAggregates {
        hit_rate: hit_count as f64 / total_games as f64,
        hit_count,
        total_games,
        streak: current_streak(games.iter().map(|game| game.hit)),
        avg_margin: total_margin / total_games as f64,
        avg_value: total_value / total_games as f64,
    };

    HeatRing { games, aggregates }
}

/// Signed run length of the leading outcome in a most-recent-first sequence.
pub fn current_streak(outcomes: impl IntoIterator<Item = bool>) -> i32 {
    let mut outcomes = outcomes.into_iter();
    let Some(first) = outcomes.next() else {
        return 0;
    };

    let run = 1 + outcomes.take_while(|hit| *hit == first).count() as i32;
    if first {
        run
    } else {
        -run
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::logs_with_values;

    use super::{compute_heat_ring, current_streak, HeatRingRequest};

    #[test]
    fn heat_ring_marks_hits_and_margins() {
        let logs = logs_with_values("points", &[25.0, 26.0, 18.0, 30.0]);

        let ring = compute_heat_ring(HeatRingRequest {
            game_logs: &logs,
            stat: "points",
            line: 22.5,
            max_games: 10,
        });

        assert_eq!(ring.aggregates.total_games, 4);
        assert_eq!(ring.aggregates.hit_count, 3);
        assert_eq!(ring.aggregates.streak, 2);
        assert!(ring.games[2].margin < 0.0);
        assert!(!ring.games[2].hit);
        assert!((ring.aggregates.avg_value - 24.75).abs() < 1e-12);
        assert!((ring.aggregates.avg_margin - 2.25).abs() < 1e-12);
    }

    #[test]
    fn heat_ring_caps_at_max_games() {
        let logs = logs_with_values("points", &[10.0; 15]);

        let ring = compute_heat_ring(HeatRingRequest {
            game_logs: &logs,
            stat: "points",
            line: 12.5,
            max_games: 10,
        });

        assert_eq!(ring.games.len(), 10);
        assert_eq!(ring.aggregates.hit_count, 0);
        assert_eq!(ring.aggregates.streak, -10);
    }

    #[test]
    fn empty_history_yields_zeroed_ring() {
        let ring = compute_heat_ring(HeatRingRequest {
            game_logs: &[],
            stat: "points",
            line: 20.5,
            max_games: 10,
        });

        assert!(ring.games.is_empty());
        assert_eq!(ring.aggregates.total_games, 0);
        assert_eq!(ring.aggregates.streak, 0);
        assert_eq!(ring.aggregates.hit_rate, 0.0);
    }

    #[test]
    fn streak_counts_leading_run_only() {
        assert_eq!(current_streak([true, true, false, true]), 2);
        assert_eq!(current_streak([false, true]), -1);
        assert_eq!(current_streak(Vec::<bool>::new()), 0);
    }
}
