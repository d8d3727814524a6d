pub mod teammate;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::convergence::{score_prop, ConvergenceRuntime, DeterministicConvergenceRuntime, ScoredProp};
use crate::domain::convergence::Signal;
use crate::domain::game_log::{DefenseRanking, COMBINED_STAT_SEPARATOR};
use crate::domain::snapshot::{PitcherContext, PlatoonSplit, PropSnapshot, WeatherContext};

pub use self::teammate::{teammate_absence_impact, ImpactDirection, TeammateImpact, TeammateLog};

/// Exclusive lower bound; -100% would zero every historical value.
pub(crate) const MIN_STAT_ADJUSTMENT_PCT: f64 = -100.0;
pub(crate) const MAX_STAT_ADJUSTMENT_PCT: f64 = 200.0;

pub(crate) fn stat_adjustment_in_range(pct: f64) -> bool {
    pct.is_finite() && pct > MIN_STAT_ADJUSTMENT_PCT && pct <= MAX_STAT_ADJUSTMENT_PCT
}

/// One counterfactual change to a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WhatIfModification {
    Line { value: f64 },
    OpponentRank { rank: u32 },
    Venue { is_home: bool },
    RestDays { days: u32 },
    BackToBack { value: bool },
    Weather { context: Option<WeatherContext> },
    OpposingPitcher { context: Option<PitcherContext> },
    Platoon { context: Option<PlatoonSplit> },
    /// Scales every historical value of the evaluated stat by `1 + pct / 100`.
    StatAdjustment { pct: f64 },
}

impl WhatIfModification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Line { .. } => "line",
            Self::OpponentRank { .. } => "opponent_rank",
            Self::Venue { .. } => "venue",
            Self::RestDays { .. } => "rest_days",
            Self::BackToBack { .. } => "back_to_back",
            Self::Weather { .. } => "weather",
            Self::OpposingPitcher { .. } => "opposing_pitcher",
            Self::Platoon { .. } => "platoon",
            Self::StatAdjustment { .. } => "stat_adjustment",
        }
    }

    /// Application order. Rest is applied before back-to-back so an explicit
    /// back-to-back flag always wins.
    fn order(&self) -> u8 {
        match self {
            Self::Line { .. } => 0,
            Self::OpponentRank { .. } => 1,
            Self::Venue { .. } => 2,
            Self::RestDays { .. } => 3,
            Self::BackToBack { .. } => 4,
            Self::Weather { .. } => 5,
            Self::OpposingPitcher { .. } => 6,
            Self::Platoon { .. } => 7,
            Self::StatAdjustment { .. } => 8,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SimulatorGuardrailError {
    #[error("simulator received {requested} modifications but max allowed is {max_allowed}")]
    TooManyModifications { requested: usize, max_allowed: usize },
    #[error("modification kind {kind} was supplied more than once")]
    DuplicateModification { kind: String },
    #[error("simulated line must be a finite number")]
    NonFiniteLine,
    #[error("opponent rank {rank} is outside 1..={total_teams}")]
    OpponentRankOutOfRange { rank: u32, total_teams: u32 },
    #[error("stat adjustment must be within (-100, 200] percent")]
    StatAdjustmentOutOfRange,
    #[error("{kind} context contains a non-finite value")]
    NonFiniteContext { kind: String },
}

impl SimulatorGuardrailError {
    pub fn user_safe_message(&self) -> String {
        match self {
            Self::TooManyModifications { max_allowed, .. } => {
                format!("You can simulate up to {max_allowed} changes at once.")
            }
            Self::DuplicateModification { kind } => {
                format!("The '{kind}' change was supplied more than once; keep one.")
            }
            Self::NonFiniteLine => "The simulated line must be a real number.".to_string(),
            Self::OpponentRankOutOfRange { total_teams, .. } => {
                format!("Opponent rank must be between 1 and {total_teams}.")
            }
            Self::StatAdjustmentOutOfRange => {
                "Stat adjustments must be above -100% and at most +200%.".to_string()
            }
            Self::NonFiniteContext { kind } => {
                format!("The '{kind}' change contains a value that is not a real number.")
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TooManyModifications { .. } => "too_many_modifications",
            Self::DuplicateModification { .. } => "duplicate_modification",
            Self::NonFiniteLine => "non_finite_line",
            Self::OpponentRankOutOfRange { .. } => "opponent_rank_out_of_range",
            Self::StatAdjustmentOutOfRange => "stat_adjustment_out_of_range",
            Self::NonFiniteContext { .. } => "non_finite_context",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactorChange {
    pub key: String,
    pub from: Option<Signal>,
    pub to: Option<Signal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhatIfDelta {
    pub direction_changed: bool,
    pub confidence_delta: i32,
    pub over_count_delta: i64,
    pub under_count_delta: i64,
    pub hit_rate_delta: f64,
    pub factor_changes: Vec<FactorChange>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub baseline: ScoredProp,
    pub simulated: ScoredProp,
    pub delta: WhatIfDelta,
    pub modifications: Vec<WhatIfModification>,
}

/// Validates and orders modifications. An empty set is allowed and
/// reproduces the baseline.
pub fn normalize_modifications(
    modifications: Vec<WhatIfModification>,
    max_modifications: usize,
    total_teams: u32,
) -> Result<Vec<WhatIfModification>, SimulatorGuardrailError> {
    if modifications.len() > max_modifications {
        return Err(SimulatorGuardrailError::TooManyModifications {
            requested: modifications.len(),
            max_allowed: max_modifications,
        });
    }

    let mut seen = BTreeSet::new();
    for modification in &modifications {
        if !seen.insert(modification.kind()) {
            return Err(SimulatorGuardrailError::DuplicateModification {
                kind: modification.kind().to_string(),
            });
        }

        match modification {
            WhatIfModification::Line { value } if !value.is_finite() => {
                return Err(SimulatorGuardrailError::NonFiniteLine);
            }
            WhatIfModification::OpponentRank { rank } if *rank == 0 || *rank > total_teams => {
                return Err(SimulatorGuardrailError::OpponentRankOutOfRange {
                    rank: *rank,
                    total_teams,
                });
            }
            WhatIfModification::StatAdjustment { pct } if !stat_adjustment_in_range(*pct) => {
                return Err(SimulatorGuardrailError::StatAdjustmentOutOfRange);
            }
            WhatIfModification::Weather { context: Some(weather) }
                if ![weather.temperature_f, weather.wind_mph, weather.precipitation_pct]
                    .iter()
                    .all(|value| value.is_finite()) =>
            {
                return Err(SimulatorGuardrailError::NonFiniteContext {
                    kind: modification.kind().to_string(),
                });
            }
            WhatIfModification::OpposingPitcher { context: Some(pitcher) }
                if !pitcher.era.is_finite() || !pitcher.innings_pitched.is_finite() =>
            {
                return Err(SimulatorGuardrailError::NonFiniteContext {
                    kind: modification.kind().to_string(),
                });
            }
            WhatIfModification::Platoon { context: Some(platoon) }
                if !platoon.split_average.is_finite() || !platoon.overall_average.is_finite() =>
            {
                return Err(SimulatorGuardrailError::NonFiniteContext {
                    kind: modification.kind().to_string(),
                });
            }
            _ => {}
        }
    }

    let mut normalized = modifications;
    normalized.sort_by_key(WhatIfModification::order);
    Ok(normalized)
}

/// Applies normalized modifications to a clone of `baseline`.
pub fn fork_snapshot(
    baseline: &PropSnapshot,
    modifications: &[WhatIfModification],
    league_size: u32,
) -> PropSnapshot {
    let mut forked = baseline.clone();

    for modification in modifications {
        match modification {
            WhatIfModification::Line { value } => forked.line = *value,
            WhatIfModification::OpponentRank { rank } => {
                let total_teams = forked
                    .defense_ranking
                    .as_ref()
                    .map(|ranking| ranking.total_teams)
                    .unwrap_or(league_size);
                forked.defense_ranking =
                    Some(DefenseRanking { rank: *rank, total_teams, label: None });
            }
            WhatIfModification::Venue { is_home } => {
                if forked.is_home() != *is_home {
                    std::mem::swap(&mut forked.game.home_team, &mut forked.game.away_team);
                }
            }
            WhatIfModification::RestDays { days } => {
                forked.rest_days = Some(*days);
                forked.is_back_to_back = Some(*days == 0);
            }
            WhatIfModification::BackToBack { value } => {
                forked.is_back_to_back = Some(*value);
                if *value {
                    forked.rest_days = Some(0);
                } else if forked.rest_days == Some(0) {
                    forked.rest_days = Some(1);
                }
            }
            WhatIfModification::Weather { context } => forked.extra.weather = context.clone(),
            WhatIfModification::OpposingPitcher { context } => {
                forked.extra.opposing_pitcher = context.clone();
            }
            WhatIfModification::Platoon { context } => forked.extra.platoon = context.clone(),
            WhatIfModification::StatAdjustment { pct } => scale_stat(&mut forked, *pct),
        }
    }

    forked
}

fn scale_stat(snapshot: &mut PropSnapshot, pct: f64) {
    let factor = 1.0 + pct / 100.0;
    let components: Vec<String> = snapshot
        .stat
        .split(COMBINED_STAT_SEPARATOR)
        .map(|component| component.trim().to_string())
        .filter(|component| !component.is_empty())
        .collect();

    for entry in &mut snapshot.game_logs {
        for component in &components {
            if let Some(value) = entry.stats.get_mut(component) {
                *value *= factor;
            }
        }
    }
    if let Some(season) = snapshot.season_stats.as_mut() {
        season.average *= factor;
    }
}

pub fn compute_delta(baseline: &ScoredProp, simulated: &ScoredProp) -> WhatIfDelta {
    let before: BTreeMap<&str, Signal> = baseline
        .convergence
        .factors
        .iter()
        .map(|factor| (factor.key.as_str(), factor.signal))
        .collect();
    let after: BTreeMap<&str, Signal> = simulated
        .convergence
        .factors
        .iter()
        .map(|factor| (factor.key.as_str(), factor.signal))
        .collect();

    let keys: BTreeSet<&str> = before.keys().chain(after.keys()).copied().collect();
    let factor_changes = keys
        .into_iter()
        .filter_map(|key| {
            let from = before.get(key).copied();
            let to = after.get(key).copied();
            (from != to).then(|| FactorChange { key: key.to_string(), from, to })
        })
        .collect();

    WhatIfDelta {
        direction_changed: baseline.verdict.direction != simulated.verdict.direction,
        confidence_delta: i32::from(simulated.verdict.confidence)
            - i32::from(baseline.verdict.confidence),
        over_count_delta: simulated.convergence.over_count as i64
            - baseline.convergence.over_count as i64,
        under_count_delta: simulated.convergence.under_count as i64
            - baseline.convergence.under_count as i64,
        hit_rate_delta: simulated.window.hit_rate - baseline.window.hit_rate,
        factor_changes,
    }
}

pub struct WhatIfSimulator<R> {
    runtime: R,
    config: EngineConfig,
}

impl WhatIfSimulator<DeterministicConvergenceRuntime> {
    pub fn with_config(config: EngineConfig) -> Self {
        Self::new(DeterministicConvergenceRuntime::default().weighted(), config)
    }
}

impl<R: ConvergenceRuntime> WhatIfSimulator<R> {
    pub fn new(runtime: R, config: EngineConfig) -> Self {
        Self { runtime, config }
    }

    pub fn simulate(
        &self,
        snapshot: &PropSnapshot,
        modifications: Vec<WhatIfModification>,
    ) -> Result<WhatIfResult, SimulatorGuardrailError> {
        let league_size = self.config.thresholds.league_size;
        let total_teams = snapshot
            .defense_ranking
            .as_ref()
            .map(|ranking| ranking.total_teams)
            .unwrap_or(league_size);

        let modifications = match normalize_modifications(
            modifications,
            self.config.simulator.max_modifications,
            total_teams,
        ) {
            Ok(modifications) => modifications,
            Err(error) => {
                debug!(
                    event_name = "engine.whatif.rejected",
                    player_id = %snapshot.player.id,
                    error_code = error.error_code(),
                    "what-if request rejected by guardrail"
                );
                return Err(error);
            }
        };

        let baseline = score_prop(&self.runtime, snapshot, &self.config);
        let forked = fork_snapshot(snapshot, &modifications, league_size);
        let simulated = score_prop(&self.runtime, &forked, &self.config);
        let delta = compute_delta(&baseline, &simulated);

        debug!(
            event_name = "engine.whatif.simulated",
            player_id = %snapshot.player.id,
            stat = %snapshot.stat,
            modification_count = modifications.len(),
            direction_changed = delta.direction_changed,
            confidence_delta = delta.confidence_delta,
            "what-if scenario simulated"
        );

        Ok(WhatIfResult { baseline, simulated, delta, modifications })
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::domain::convergence::Direction;
    use crate::domain::game_log::DefenseRanking;
    use crate::test_support::{logs_with_values, snapshot};

    use super::{
        fork_snapshot, normalize_modifications, SimulatorGuardrailError, WhatIfModification,
        WhatIfSimulator,
    };

    fn history() -> Vec<crate::domain::game_log::GameLogEntry> {
        logs_with_values("points", &[28.0, 26.0, 30.0, 27.0, 29.0, 25.0, 31.0, 26.0, 28.0, 27.0])
    }

    #[test]
    fn zero_modifications_reproduce_baseline() {
        let snapshot = snapshot("points", 22.5, history());
        let simulator = WhatIfSimulator::with_config(EngineConfig::default());

        let result = simulator.simulate(&snapshot, Vec::new()).expect("empty set is allowed");
        assert_eq!(result.baseline, result.simulated);
        assert!(!result.delta.direction_changed);
        assert_eq!(result.delta.confidence_delta, 0);
        assert!(result.delta.factor_changes.is_empty());
    }

    #[test]
    fn raising_the_line_flips_the_call() {
        let snapshot = snapshot("points", 22.5, history());
        let simulator = WhatIfSimulator::with_config(EngineConfig::default());

        let result = simulator
            .simulate(&snapshot, vec![WhatIfModification::Line { value: 33.5 }])
            .expect("valid modification");

        assert_eq!(result.baseline.verdict.direction, Direction::Over);
        assert_eq!(result.simulated.verdict.direction, Direction::Under);
        assert!(result.delta.direction_changed);
        assert!(result.delta.hit_rate_delta < 0.0);
        assert!(result
            .delta
            .factor_changes
            .iter()
            .any(|change| change.key == "season_baseline"));
        assert_eq!(snapshot.line, 22.5, "input snapshot is never mutated");
    }

    #[test]
    fn guardrails_reject_bad_requests() {
        let too_many = vec![WhatIfModification::Line { value: 20.5 }; 9];
        assert_eq!(
            normalize_modifications(too_many, 8, 30),
            Err(SimulatorGuardrailError::TooManyModifications { requested: 9, max_allowed: 8 })
        );

        let duplicate = vec![
            WhatIfModification::RestDays { days: 2 },
            WhatIfModification::RestDays { days: 3 },
        ];
        assert!(matches!(
            normalize_modifications(duplicate, 8, 30),
            Err(SimulatorGuardrailError::DuplicateModification { .. })
        ));

        let rank = vec![WhatIfModification::OpponentRank { rank: 31 }];
        assert_eq!(
            normalize_modifications(rank, 8, 30),
            Err(SimulatorGuardrailError::OpponentRankOutOfRange { rank: 31, total_teams: 30 })
        );

        let line = vec![WhatIfModification::Line { value: f64::INFINITY }];
        assert_eq!(normalize_modifications(line, 8, 30), Err(SimulatorGuardrailError::NonFiniteLine));

        let wipe = vec![WhatIfModification::StatAdjustment { pct: -100.0 }];
        assert_eq!(
            normalize_modifications(wipe, 8, 30),
            Err(SimulatorGuardrailError::StatAdjustmentOutOfRange)
        );
        assert!(normalize_modifications(
            vec![WhatIfModification::StatAdjustment { pct: 200.0 }],
            8,
            30
        )
        .is_ok());
    }

    #[test]
    fn guardrail_errors_have_stable_codes() {
        let error = SimulatorGuardrailError::TooManyModifications { requested: 12, max_allowed: 8 };
        assert_eq!(error.error_code(), "too_many_modifications");
        assert_eq!(error.user_safe_message(), "You can simulate up to 8 changes at once.");
    }

    #[test]
    fn fork_applies_context_changes_in_order() {
        let mut baseline = snapshot("points+rebounds", 30.5, logs_with_values("points", &[20.0]));
        baseline.game_logs[0].stats.insert("rebounds".to_string(), 10.0);
        baseline.game_logs[0].stats.insert("assists".to_string(), 5.0);
        baseline.defense_ranking = Some(DefenseRanking { rank: 10, total_teams: 32, label: None });

        let modifications = normalize_modifications(
            vec![
                WhatIfModification::BackToBack { value: true },
                WhatIfModification::RestDays { days: 3 },
                WhatIfModification::Venue { is_home: false },
                WhatIfModification::OpponentRank { rank: 32 },
                WhatIfModification::StatAdjustment { pct: 10.0 },
            ],
            8,
            32,
        )
        .expect("valid modifications");
        let forked = fork_snapshot(&baseline, &modifications, 30);

        assert!(!forked.is_home());
        assert_eq!(forked.opponent(), "PHX");
        assert!(forked.is_back_to_back());
        assert_eq!(forked.rest_days(), Some(0));
        assert_eq!(forked.defense_ranking.as_ref().map(|ranking| ranking.total_teams), Some(32));
        let entry = &forked.game_logs[0];
        assert_eq!(entry.stat_value("points+rebounds").map(|value| value.round()), Some(33.0));
        assert_eq!(entry.stats.get("assists"), Some(&5.0));
        assert!(baseline.is_home());
    }
}
