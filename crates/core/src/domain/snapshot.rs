use serde::{Deserialize, Serialize};

use crate::domain::game_log::{DefenseRanking, GameLogEntry, SeasonStats};
use crate::domain::player::{Game, InjuryReport, Player};
use crate::errors::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
    Switch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub temperature_f: f64,
    pub wind_mph: f64,
    #[serde(default)]
    pub precipitation_pct: f64,
    #[serde(default)]
    pub is_dome: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PitcherContext {
    pub name: String,
    pub throws: Hand,
    pub era: f64,
    #[serde(default)]
    pub whip: Option<f64>,
    pub innings_pitched: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatoonSplit {
    pub vs_hand: Hand,
    pub split_average: f64,
    pub overall_average: f64,
    pub plate_appearances: u32,
}

/// Optional sport-specific context. Each part is resolved independently by the
/// caller and may be missing without affecting the rest of the evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraContext {
    #[serde(default)]
    pub weather: Option<WeatherContext>,
    #[serde(default)]
    pub opposing_pitcher: Option<PitcherContext>,
    #[serde(default)]
    pub platoon: Option<PlatoonSplit>,
}

impl ExtraContext {
    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.opposing_pitcher.is_none() && self.platoon.is_none()
    }
}

/// Fully assembled, immutable input for one player/stat/line evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropSnapshot {
    pub player: Player,
    pub game: Game,
    /// Most-recent-first.
    #[serde(default)]
    pub game_logs: Vec<GameLogEntry>,
    #[serde(default)]
    pub season_stats: Option<SeasonStats>,
    #[serde(default)]
    pub defense_ranking: Option<DefenseRanking>,
    #[serde(default)]
    pub injuries: Vec<InjuryReport>,
    pub stat: String,
    pub line: f64,
    #[serde(default)]
    pub rest_days: Option<u32>,
    #[serde(default)]
    pub is_back_to_back: Option<bool>,
    #[serde(default)]
    pub extra: ExtraContext,
}

impl PropSnapshot {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.stat.trim().is_empty() {
            return Err(EngineError::InvalidInput("stat name is required".to_string()));
        }
        if !self.line.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "line must be a finite number (got {})",
                self.line
            )));
        }
        if self.player.team.trim().is_empty() {
            return Err(EngineError::InvalidInput("player.team is required".to_string()));
        }
        if let Some(ranking) = &self.defense_ranking {
            if ranking.rank == 0 || ranking.total_teams == 0 || ranking.rank > ranking.total_teams {
                return Err(EngineError::InvalidInput(format!(
                    "defense_ranking.rank must be within 1..={} (got {})",
                    ranking.total_teams, ranking.rank
                )));
            }
        }
        Ok(())
    }

    pub fn is_home(&self) -> bool {
        self.game.is_home_for(&self.player.team)
    }

    pub fn opponent(&self) -> &str {
        self.game.opponent_of(&self.player.team)
    }

    /// Days of rest before this game, `None` when the caller did not know.
    /// A back-to-back always reports zero.
    pub fn rest_days(&self) -> Option<u32> {
        if self.is_back_to_back() {
            return Some(0);
        }
        self.rest_days
    }

    /// Zero days of rest counts as a back-to-back even without the flag.
    pub fn is_back_to_back(&self) -> bool {
        self.is_back_to_back.unwrap_or(false) || self.rest_days == Some(0)
    }

    /// Supplied season stats for this stat, or a value derived from the logs
    /// when none were supplied or they describe a different stat.
    pub fn season(&self) -> SeasonStats {
        match &self.season_stats {
            Some(season) if season.games > 0 && season.covers(&self.stat) => season.clone(),
            _ => SeasonStats::from_logs(&self.game_logs, &self.stat),
        }
    }
}
