pub mod factors;
pub mod verdict;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::window::{window_stats, WindowStats};
use crate::config::{EngineConfig, EngineThresholds};
use crate::domain::convergence::{
    ConvergenceFactor, ConvergenceResult, Signal, Verdict, WeightedFactors,
};
use crate::domain::snapshot::PropSnapshot;

use self::factors::{standard_roster, FactorEvaluator};

pub use self::verdict::{convergence_score, synthesize_verdict};

pub trait ConvergenceRuntime: Send + Sync {
    fn evaluate(&self, snapshot: &PropSnapshot, thresholds: &EngineThresholds) -> ConvergenceResult;
}

/// Runs a fixed evaluator roster in order and tallies the result.
pub struct DeterministicConvergenceRuntime {
    evaluators: Vec<Box<dyn FactorEvaluator>>,
    weighted: bool,
}

impl DeterministicConvergenceRuntime {
    pub fn new(evaluators: Vec<Box<dyn FactorEvaluator>>) -> Self {
        Self { evaluators, weighted: false }
    }

    /// Also fill `weighted_factors` on every result.
    pub fn weighted(mut self) -> Self {
        self.weighted = true;
        self
    }
}

impl Default for DeterministicConvergenceRuntime {
    fn default() -> Self {
        Self::new(standard_roster())
    }
}

impl ConvergenceRuntime for DeterministicConvergenceRuntime {
    fn evaluate(&self, snapshot: &PropSnapshot, thresholds: &EngineThresholds) -> ConvergenceResult {
        let factors: Vec<ConvergenceFactor> = self
            .evaluators
            .iter()
            .filter_map(|evaluator| evaluator.evaluate(snapshot, thresholds))
            .collect();
        let result = aggregate(factors, self.weighted);

        debug!(
            event_name = "engine.convergence.evaluated",
            player_id = %snapshot.player.id,
            stat = %snapshot.stat,
            line = snapshot.line,
            over_count = result.over_count,
            under_count = result.under_count,
            neutral_count = result.neutral_count,
            roster_size = result.roster_size,
            "convergence factors evaluated"
        );
        for factor in &result.factors {
            debug!(
                event_name = "engine.convergence.factor",
                key = %factor.key,
                signal = factor.signal.as_str(),
                strength = factor.strength,
                detail = %factor.detail,
                "factor evaluated"
            );
        }
        result
    }
}

/// Convergence, verdict and the trailing window it was blended with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredProp {
    pub convergence: ConvergenceResult,
    pub verdict: Verdict,
    pub window: WindowStats,
}

pub fn score_prop<R: ConvergenceRuntime + ?Sized>(
    runtime: &R,
    snapshot: &PropSnapshot,
    config: &EngineConfig,
) -> ScoredProp {
    let convergence = runtime.evaluate(snapshot, &config.thresholds);
    let window = window_stats(
        &snapshot.game_logs,
        &snapshot.stat,
        snapshot.line,
        Some(config.verdict.hit_rate_window),
    );
    let verdict = synthesize_verdict(
        &convergence,
        window.hit_rate,
        window.avg_margin,
        snapshot.season().average,
        &config.verdict,
    );
    ScoredProp { convergence, verdict, window }
}

pub fn evaluate_convergence(
    snapshot: &PropSnapshot,
    thresholds: &EngineThresholds,
) -> ConvergenceResult {
    DeterministicConvergenceRuntime::default().evaluate(snapshot, thresholds)
}

pub fn evaluate_convergence_weighted(
    snapshot: &PropSnapshot,
    thresholds: &EngineThresholds,
) -> ConvergenceResult {
    DeterministicConvergenceRuntime::default().weighted().evaluate(snapshot, thresholds)
}

/// Tallies signals. The roster size is the number of factors produced, so
/// omitted extensions never count against agreement.
pub fn aggregate(factors: Vec<ConvergenceFactor>, weighted: bool) -> ConvergenceResult {
    let mut over_count = 0;
    let mut under_count = 0;
    let mut neutral_count = 0;
    let mut weights = WeightedFactors::default();

    for factor in &factors {
        match factor.signal {
            Signal::Over => {
                over_count += 1;
                weights.over_strength += factor.strength;
            }
            Signal::Under => {
                under_count += 1;
                weights.under_strength += factor.strength;
            }
            Signal::Neutral => {
                neutral_count += 1;
                weights.neutral_strength += factor.strength;
            }
        }
    }
    weights.net_strength = weights.over_strength - weights.under_strength;

    ConvergenceResult {
        roster_size: factors.len(),
        factors,
        over_count,
        under_count,
        neutral_count,
        weighted_factors: weighted.then_some(weights),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineThresholds;
    use crate::domain::convergence::{ConvergenceFactor, Signal};
    use crate::domain::snapshot::WeatherContext;
    use crate::test_support::{logs_with_values, snapshot};

    use super::{aggregate, evaluate_convergence, evaluate_convergence_weighted};

    #[test]
    fn aggregate_counts_every_factor_once() {
        let factors = vec![
            ConvergenceFactor::new("a", "A", Signal::Over, 0.8, "", None),
            ConvergenceFactor::new("b", "B", Signal::Over, 0.4, "", None),
            ConvergenceFactor::new("c", "C", Signal::Under, 0.5, "", None),
            ConvergenceFactor::insufficient("d", "D", "thin"),
        ];

        let result = aggregate(factors, true);
        assert_eq!((result.over_count, result.under_count, result.neutral_count), (2, 1, 1));
        assert_eq!(result.roster_size, 4);

        let weights = result.weighted_factors.expect("weighted path fills weights");
        assert!((weights.over_strength - 1.2).abs() < 1e-12);
        assert!((weights.net_strength - 0.7).abs() < 1e-12);
    }

    #[test]
    fn plain_path_leaves_weights_empty() {
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &[25.0; 12]));
        let thresholds = EngineThresholds::default();

        let plain = evaluate_convergence(&snapshot, &thresholds);
        let weighted = evaluate_convergence_weighted(&snapshot, &thresholds);

        assert!(plain.weighted_factors.is_none());
        assert!(weighted.weighted_factors.is_some());
        assert_eq!(plain.factors, weighted.factors);
        assert_eq!(plain.roster_size, 7);
    }

    #[test]
    fn roster_grows_with_extra_context() {
        let mut snapshot = snapshot("hits", 0.5, logs_with_values("hits", &[1.0, 2.0, 0.0, 1.0]));
        snapshot.extra.weather = Some(WeatherContext {
            temperature_f: 78.0,
            wind_mph: 4.0,
            precipitation_pct: 0.0,
            is_dome: false,
        });

        let result = evaluate_convergence(&snapshot, &EngineThresholds::default());
        assert_eq!(result.roster_size, 8);
        assert_eq!(result.factors.len(), result.roster_size);
        assert!(result.factor("weather").is_some());
        assert!(result.factor("platoon_split").is_none());
    }

    #[test]
    fn evaluation_is_idempotent() {
        let snapshot = snapshot("points", 20.5, logs_with_values("points", &[18.0, 25.0, 22.0, 30.0, 19.0]));
        let thresholds = EngineThresholds::default();

        assert_eq!(
            evaluate_convergence_weighted(&snapshot, &thresholds),
            evaluate_convergence_weighted(&snapshot, &thresholds)
        );
    }
}
