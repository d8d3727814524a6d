use serde::{Deserialize, Serialize};

use crate::domain::game_log::{stat_samples, GameLogEntry, StatSample};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub hit_rate: f64,
    pub avg_margin: f64,
    pub avg_value: f64,
    pub games_in_window: usize,
}

/// The first `window` games carrying `stat`, or all of them when `window` is
/// `None` or larger than the history. Logs are most-recent-first.
pub fn windowed_samples<'a>(
    logs: &'a [GameLogEntry],
    stat: &str,
    window: Option<usize>,
) -> Vec<StatSample<'a>> {
    let mut samples = stat_samples(logs, stat);
    if let Some(window) = window {
        samples.truncate(window);
    }
    samples
}

/// Share of windowed games strictly above `line`. A push counts as a miss.
pub fn hit_rate(logs: &[GameLogEntry], stat: &str, line: f64, window: Option<usize>) -> f64 {
    window_stats(logs, stat, line, window).hit_rate
}

pub fn avg_margin(logs: &[GameLogEntry], stat: &str, line: f64, window: Option<usize>) -> f64 {
    window_stats(logs, stat, line, window).avg_margin
}

pub fn window_stats(
    logs: &[GameLogEntry],
    stat: &str,
    line: f64,
    window: Option<usize>,
) -> WindowStats {
    let samples = windowed_samples(logs, stat, window);
    if samples.is_empty() {
        return WindowStats::default();
    }

    let games = samples.len() as f64;
    let hits = samples.iter().filter(|sample| sample.value > line).count() as f64;
    let total: f64 = samples.iter().map(|sample| sample.value).sum();

    WindowStats {
        hit_rate: hits / games,
        avg_margin: total / games - line,
        avg_value: total / games,
        games_in_window: samples.len(),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::logs_with_values;

    use super::{avg_margin, hit_rate, window_stats};

    #[test]
    fn seven_of_ten_above_line_is_seventy_percent() {
        let logs = logs_with_values(
            "points",
            &[25.0, 22.0, 21.0, 30.0, 18.0, 24.0, 19.0, 27.0, 23.0, 15.0],
        );

        let rate = hit_rate(&logs, "points", 20.5, Some(10));
        assert!((rate - 0.7).abs() < 1e-12);
    }

    #[test]
    fn window_larger_than_history_uses_every_game() {
        let values: Vec<f64> = (0..12).map(|index| 10.0 + index as f64).collect();
        let logs = logs_with_values("points", &values);

        let stats = window_stats(&logs, "points", 15.0, Some(20));
        assert_eq!(stats.games_in_window, 12);
    }

    #[test]
    fn window_takes_most_recent_games_first() {
        let logs = logs_with_values("points", &[30.0, 30.0, 10.0, 10.0, 10.0]);

        assert_eq!(hit_rate(&logs, "points", 20.0, Some(2)), 1.0);
        assert!((avg_margin(&logs, "points", 20.0, Some(2)) - 10.0).abs() < 1e-12);
        assert!((hit_rate(&logs, "points", 20.0, None) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn push_counts_as_miss() {
        let logs = logs_with_values("points", &[20.0, 21.0]);
        assert!((hit_rate(&logs, "points", 20.0, None) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_window_is_zeroed() {
        let logs = logs_with_values("rebounds", &[8.0, 9.0]);

        let stats = window_stats(&logs, "points", 20.0, Some(10));
        assert_eq!(stats.games_in_window, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert_eq!(stats.avg_margin, 0.0);
        assert_eq!(window_stats(&logs, "rebounds", 5.0, Some(0)).games_in_window, 0);
    }
}
