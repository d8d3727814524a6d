use std::collections::VecDeque;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::game_log::{stat_samples, GameLogEntry};

#[derive(Clone, Debug)]
pub struct TimelineRequest<'a> {
    pub game_logs: &'a [GameLogEntry],
    pub stat: &'a str,
    pub line: f64,
    pub season_avg: f64,
    pub window: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub opponent: String,
    pub value: f64,
    pub moving_avg: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Oldest-first.
    pub points: Vec<TimelinePoint>,
    pub season_avg: f64,
    pub line: f64,
    pub window: usize,
}

/// Chronological series with a trailing moving average. The first points
/// average over however many games precede them.
pub fn build_game_log_timeline(request: TimelineRequest<'_>) -> Timeline {
    let window = request.window.max(1);
    let mut samples = stat_samples(request.game_logs, request.stat);
    samples.sort_by_key(|sample| sample.entry.date);

    let mut trailing = VecDeque::with_capacity(window);
    let mut trailing_sum = 0.0;
    let points = samples
        .into_iter()
        .map(|sample| {
            trailing.push_back(sample.value);
            trailing_sum += sample.value;
            if trailing.len() > window {
                if let Some(dropped) = trailing.pop_front() {
                    trailing_sum -= dropped;
                }
            }

            TimelinePoint {
                date: sample.entry.date,
                opponent: sample.entry.opponent.clone(),
                value: sample.value,
                moving_avg: trailing_sum / trailing.len() as f64,
            }
        })
        .collect();

    Timeline { points, season_avg: request.season_avg, line: request.line, window }
}
