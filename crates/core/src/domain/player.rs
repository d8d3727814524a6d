use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Basketball,
    Football,
    Baseball,
    Hockey,
    Soccer,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basketball => "basketball",
            Self::Football => "football",
            Self::Baseball => "baseball",
            Self::Hockey => "hockey",
            Self::Soccer => "soccer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: String,
    pub sport: Sport,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub former_teams: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    #[serde(default)]
    pub id: Option<String>,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
}

impl Game {
    /// Whether `team` is the home side. Team names compare case-insensitively.
    pub fn is_home_for(&self, team: &str) -> bool {
        same_team(&self.home_team, team)
    }

    /// The side `team` plays against. Falls back to the home team when `team`
    /// is on neither side, which only happens with malformed orchestrator input.
    pub fn opponent_of(&self, team: &str) -> &str {
        if same_team(&self.home_team, team) {
            &self.away_team
        } else {
            &self.home_team
        }
    }
}

pub fn same_team(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

impl InjuryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::Doubtful => "doubtful",
            Self::Questionable => "questionable",
            Self::Probable => "probable",
        }
    }

    /// `out` and `doubtful` are treated as absences.
    pub fn is_likely_absent(&self) -> bool {
        matches!(self, Self::Out | Self::Doubtful)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InjuryReport {
    pub player_name: String,
    pub team: String,
    pub status: InjuryStatus,
    #[serde(default)]
    pub detail: Option<String>,
}
