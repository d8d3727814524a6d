pub mod analytics;
pub mod cache;
pub mod config;
pub mod convergence;
pub mod domain;
pub mod errors;
pub mod narrative;
pub mod report;
pub mod similar;
pub mod whatif;

#[cfg(test)]
pub(crate) mod test_support;

pub use analytics::{
    build_game_log_timeline, compute_heat_ring, compute_spectrum, hit_rate, window_stats,
    HeatRing, HeatRingRequest, PropSpectrum, SpectrumRequest, Timeline, TimelineRequest,
    WindowStats,
};
pub use cache::{SnapshotCache, TtlCache};
pub use config::{AppConfig, EngineConfig, EngineThresholds, VerdictPolicy, WeatherThresholds};
pub use convergence::{
    evaluate_convergence, evaluate_convergence_weighted, synthesize_verdict, ConvergenceRuntime,
    DeterministicConvergenceRuntime, ScoredProp,
};
pub use domain::convergence::{
    ConvergenceFactor, ConvergenceResult, Direction, Signal, Verdict, WeightedFactors,
};
pub use domain::game_log::{DefenseRanking, GameLogEntry, SeasonStats};
pub use domain::player::{Game, InjuryReport, InjuryStatus, Player, PlayerId, Sport};
pub use domain::snapshot::{ExtraContext, PropSnapshot};
pub use errors::{ApplicationError, EngineError, InterfaceError};
pub use narrative::{NarrativeContext, NarrativeDetector, NarrativeFlag};
pub use report::{analyze_prop, snapshot_fingerprint, PropReport};
pub use similar::{
    SimilarSituationMatcher, SimilarSituationOutcome, SimilarSituationRequest, SimilarSituationSet,
};
pub use whatif::{
    teammate_absence_impact, SimulatorGuardrailError, TeammateImpact, TeammateLog,
    WhatIfModification, WhatIfResult, WhatIfSimulator,
};
