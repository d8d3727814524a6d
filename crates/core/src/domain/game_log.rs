use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const COMBINED_STAT_SEPARATOR: char = '+';

/// One completed game for one player. Owned by the caller; the engine only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameLogEntry {
    #[serde(default)]
    pub game_id: Option<String>,
    pub date: NaiveDate,
    pub opponent: String,
    pub is_home: bool,
    #[serde(default)]
    pub rest_days: u32,
    #[serde(default)]
    pub is_back_to_back: bool,
    #[serde(default)]
    pub opponent_defense_rank: Option<u32>,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
}

impl GameLogEntry {
    /// Resolves a stat key against this game.
    ///
    /// Combined keys such as `points+rebounds` resolve to the sum of their
    /// components and are only present when every component is present.
    pub fn stat_value(&self, stat: &str) -> Option<f64> {
        let stat = stat.trim();
        if stat.is_empty() {
            return None;
        }

        if !stat.contains(COMBINED_STAT_SEPARATOR) {
            return self.stats.get(stat).copied().filter(|value| value.is_finite());
        }

        let mut total = 0.0;
        for component in stat.split(COMBINED_STAT_SEPARATOR) {
            let component = component.trim();
            if component.is_empty() {
                return None;
            }
            let value = self.stats.get(component).copied().filter(|value| value.is_finite())?;
            total += value;
        }
        Some(total)
    }
}

/// A game paired with its resolved stat value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatSample<'a> {
    pub entry: &'a GameLogEntry,
    pub value: f64,
}

/// Games carrying `stat`, in the order given (most-recent-first by convention).
pub fn stat_samples<'a>(logs: &'a [GameLogEntry], stat: &str) -> Vec<StatSample<'a>> {
    logs.iter()
        .filter_map(|entry| entry.stat_value(stat).map(|value| StatSample { entry, value }))
        .collect()
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonStats {
    pub stat: String,
    pub average: f64,
    pub games: u32,
}

impl SeasonStats {
    pub fn from_logs(logs: &[GameLogEntry], stat: &str) -> Self {
        let samples = stat_samples(logs, stat);
        let average = mean(samples.iter().map(|sample| sample.value)).unwrap_or(0.0);
        Self { stat: stat.trim().to_string(), average, games: samples.len() as u32 }
    }

    /// Whether these stats were compiled for `stat`, ignoring whitespace
    /// around combined-key components and ASCII case.
    pub fn covers(&self, stat: &str) -> bool {
        let supplied = stat_key(&self.stat);
        !supplied.is_empty() && supplied.eq_ignore_ascii_case(&stat_key(stat))
    }
}

fn stat_key(stat: &str) -> String {
    let separator = COMBINED_STAT_SEPARATOR.to_string();
    stat.split(COMBINED_STAT_SEPARATOR).map(str::trim).collect::<Vec<_>>().join(separator.as_str())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseTier {
    Top,
    Middle,
    Bottom,
}

impl DefenseTier {
    /// Tertile of `rank` among `total_teams` (rank 1 = best defense).
    pub fn from_rank(rank: u32, total_teams: u32) -> Self {
        let total = total_teams.max(rank).max(1) as f64;
        let position = rank.max(1) as f64;
        if position <= total / 3.0 {
            Self::Top
        } else if position > total * 2.0 / 3.0 {
            Self::Bottom
        } else {
            Self::Middle
        }
    }

    pub fn ordinal(&self) -> i32 {
        match self {
            Self::Top => 0,
            Self::Middle => 1,
            Self::Bottom => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefenseRanking {
    pub rank: u32,
    pub total_teams: u32,
    #[serde(default)]
    pub label: Option<String>,
}

impl DefenseRanking {
    pub fn tier(&self) -> DefenseTier {
        DefenseTier::from_rank(self.rank, self.total_teams)
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| format!("#{} of {}", self.rank, self.total_teams))
    }
}
