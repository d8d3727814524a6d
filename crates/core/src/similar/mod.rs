use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, SimilarConfig};
use crate::domain::game_log::{stat_samples, DefenseTier, GameLogEntry};
use crate::domain::snapshot::PropSnapshot;

#[derive(Clone, Debug)]
pub struct SimilarSituationRequest<'a> {
    pub game_logs: &'a [GameLogEntry],
    pub stat: &'a str,
    pub line: f64,
    pub defense_rank: Option<u32>,
    pub is_home: bool,
    pub rest_days: Option<u32>,
    pub is_back_to_back: bool,
    pub league_size: u32,
}

impl<'a> SimilarSituationRequest<'a> {
    pub fn from_snapshot(snapshot: &'a PropSnapshot, league_size: u32) -> Self {
        let league_size = snapshot
            .defense_ranking
            .as_ref()
            .map(|ranking| ranking.total_teams.max(league_size))
            .unwrap_or(league_size);
        Self {
            game_logs: &snapshot.game_logs,
            stat: &snapshot.stat,
            line: snapshot.line,
            defense_rank: snapshot.defense_ranking.as_ref().map(|ranking| ranking.rank),
            is_home: snapshot.is_home(),
            rest_days: snapshot.rest_days(),
            is_back_to_back: snapshot.is_back_to_back(),
            league_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SituationCriteria {
    /// `None` when today's defensive ranking is unknown and the feature is ignored.
    pub defense_tier: Option<DefenseTier>,
    pub is_home: bool,
    /// 0 = back-to-back, then one bucket per day of rest up to the configured
    /// cap. `None` when today's rest is unknown and the feature is ignored.
    pub rest_bucket: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarGame {
    pub date: NaiveDate,
    pub opponent: String,
    pub value: f64,
    pub hit: bool,
    pub margin: f64,
    pub similarity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarSituationSet {
    pub criteria: SituationCriteria,
    pub games: Vec<SimilarGame>,
    pub hit_rate: f64,
    pub avg_value: f64,
    pub avg_margin: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SimilarSituationOutcome {
    Available(SimilarSituationSet),
    InsufficientSample { found: usize, required: usize },
    Unavailable,
}

impl SimilarSituationOutcome {
    pub fn set(&self) -> Option<&SimilarSituationSet> {
        match self {
            Self::Available(set) => Some(set),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SimilarSituationMatcher {
    config: SimilarConfig,
}

impl SimilarSituationMatcher {
    pub fn new(config: SimilarConfig) -> Self {
        Self { config }
    }

    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(config.similar.clone())
    }

    pub fn find(&self, request: &SimilarSituationRequest<'_>) -> SimilarSituationOutcome {
        let samples = stat_samples(request.game_logs, request.stat);
        if samples.is_empty() {
            return SimilarSituationOutcome::Unavailable;
        }

        let observed_max = samples
            .iter()
            .filter_map(|sample| sample.entry.opponent_defense_rank)
            .max()
            .unwrap_or(0);
        let total_teams = request.league_size.max(observed_max);
        let criteria = SituationCriteria {
            defense_tier: request.defense_rank.map(|rank| DefenseTier::from_rank(rank, total_teams)),
            is_home: request.is_home,
            rest_bucket: if request.is_back_to_back {
                Some(0)
            } else {
                request.rest_days.map(|days| self.rest_bucket(days, false))
            },
        };

        let mut games: Vec<SimilarGame> = samples
            .iter()
            .filter_map(|sample| {
                let similarity = self.similarity(&criteria, sample.entry, total_teams)?;
                (similarity >= self.config.min_similarity).then(|| SimilarGame {
                    date: sample.entry.date,
                    opponent: sample.entry.opponent.clone(),
                    value: sample.value,
                    hit: sample.value > request.line,
                    margin: sample.value - request.line,
                    similarity,
                })
            })
            .collect();

        games.sort_by(|left, right| {
            right
                .similarity
                .partial_cmp(&left.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| right.date.cmp(&left.date))
        });
        games.truncate(self.config.max_games);

        if games.len() < self.config.min_games {
            return SimilarSituationOutcome::InsufficientSample {
                found: games.len(),
                required: self.config.min_games,
            };
        }

        let count = games.len() as f64;
        let hits = games.iter().filter(|game| game.hit).count() as f64;
        let avg_value = games.iter().map(|game| game.value).sum::<f64>() / count;
        let avg_margin = games.iter().map(|game| game.margin).sum::<f64>() / count;

        SimilarSituationOutcome::Available(SimilarSituationSet {
            criteria,
            games,
            hit_rate: hits / count,
            avg_value,
            avg_margin,
        })
    }

    fn rest_bucket(&self, rest_days: u32, is_back_to_back: bool) -> u32 {
        if is_back_to_back {
            0
        } else {
            rest_days.min(self.config.max_rest_bucket)
        }
    }

    /// `None` when the game cannot be compared on an active feature.
    fn similarity(
        &self,
        criteria: &SituationCriteria,
        entry: &GameLogEntry,
        total_teams: u32,
    ) -> Option<f64> {
        let config = &self.config;
        let tier_distance = match criteria.defense_tier {
            Some(today) => {
                let rank = entry.opponent_defense_rank?;
                let historical = DefenseTier::from_rank(rank, total_teams);
                f64::from((today.ordinal() - historical.ordinal()).abs())
            }
            None => 0.0,
        };
        let venue_distance = if entry.is_home == criteria.is_home { 0.0 } else { 1.0 };
        let rest_distance = match criteria.rest_bucket {
            Some(today) => {
                let bucket = self.rest_bucket(entry.rest_days, entry.is_back_to_back);
                (f64::from(bucket.abs_diff(today)) * config.rest_weight).min(config.rest_penalty_cap)
            }
            None => 0.0,
        };

        let distance = config.tier_weight * tier_distance
            + config.venue_weight * venue_distance
            + rest_distance;
        Some((1.0 - distance / config.max_distance()).max(0.0))
    }
}
