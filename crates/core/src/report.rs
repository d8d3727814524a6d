use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::heat_ring::{compute_heat_ring, HeatRing, HeatRingRequest};
use crate::analytics::spectrum::{compute_spectrum, PropSpectrum, SpectrumRequest};
use crate::analytics::timeline::{build_game_log_timeline, Timeline, TimelineRequest};
use crate::analytics::window::WindowStats;
use crate::config::EngineConfig;
use crate::convergence::{score_prop, DeterministicConvergenceRuntime, ScoredProp};
use crate::domain::convergence::{ConvergenceResult, Verdict};
use crate::domain::player::PlayerId;
use crate::domain::snapshot::PropSnapshot;
use crate::errors::EngineError;
use crate::narrative::{NarrativeContext, NarrativeDetector, NarrativeFlag};
use crate::similar::{SimilarSituationMatcher, SimilarSituationOutcome, SimilarSituationRequest};

/// Everything the engine says about one player/stat/line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropReport {
    pub fingerprint: String,
    pub player_id: PlayerId,
    pub player_name: String,
    pub stat: String,
    pub line: f64,
    pub verdict: Verdict,
    pub convergence: ConvergenceResult,
    pub window: WindowStats,
    pub heat_ring: HeatRing,
    pub spectrum: PropSpectrum,
    pub timeline: Timeline,
    pub narratives: Vec<NarrativeFlag>,
    pub similar_situations: SimilarSituationOutcome,
}

pub fn analyze_prop(snapshot: &PropSnapshot, config: &EngineConfig) -> Result<PropReport, EngineError> {
    snapshot.validate()?;

    let runtime = DeterministicConvergenceRuntime::default().weighted();
    let ScoredProp { convergence, verdict, window } = score_prop(&runtime, snapshot, config);
    check_tally(&convergence)?;

    let season = snapshot.season();
    let heat_ring = compute_heat_ring(HeatRingRequest {
        game_logs: &snapshot.game_logs,
        stat: &snapshot.stat,
        line: snapshot.line,
        max_games: config.windows.heat_ring_games,
    });
    let spectrum = compute_spectrum(SpectrumRequest {
        game_logs: &snapshot.game_logs,
        stat: &snapshot.stat,
        line: snapshot.line,
        league_size: config.thresholds.league_size,
        points: config.windows.spectrum_points,
    });
    let timeline = build_game_log_timeline(TimelineRequest {
        game_logs: &snapshot.game_logs,
        stat: &snapshot.stat,
        line: snapshot.line,
        season_avg: season.average,
        window: config.windows.moving_average_window,
    });
    let narratives = NarrativeDetector::from_engine_config(config)
        .detect(&NarrativeContext::from_snapshot(snapshot));
    let similar_situations = SimilarSituationMatcher::from_engine_config(config)
        .find(&SimilarSituationRequest::from_snapshot(snapshot, config.thresholds.league_size));

    let fingerprint = snapshot_fingerprint(snapshot);
    debug!(
        event_name = "engine.report.built",
        fingerprint = %fingerprint,
        player_id = %snapshot.player.id,
        sport = snapshot.player.sport.as_str(),
        stat = %snapshot.stat,
        verdict = %verdict.label,
        direction = verdict.direction.as_str(),
        confidence = verdict.confidence,
        has_extra_context = !snapshot.extra.is_empty(),
        narrative_count = narratives.len(),
        "prop report built"
    );

    Ok(PropReport {
        fingerprint,
        player_id: snapshot.player.id.clone(),
        player_name: snapshot.player.name.clone(),
        stat: snapshot.stat.clone(),
        line: snapshot.line,
        verdict,
        convergence,
        window,
        heat_ring,
        spectrum,
        timeline,
        narratives,
        similar_situations,
    })
}

/// Stable content hash of a snapshot. Field order is fixed by the type
/// definitions and stat maps are ordered, so equal snapshots hash equally.
pub fn snapshot_fingerprint(snapshot: &PropSnapshot) -> String {
    let canonical = serde_json::to_vec(snapshot).unwrap_or_default();
    blake3::hash(&canonical).to_hex().to_string()
}

fn check_tally(result: &ConvergenceResult) -> Result<(), EngineError> {
    let tallied = result.over_count + result.under_count + result.neutral_count;
    if tallied != result.roster_size || result.factors.len() != result.roster_size {
        return Err(EngineError::InvariantViolation(format!(
            "tallied {tallied} signals over {} factors for a roster of {}",
            result.factors.len(),
            result.roster_size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::domain::convergence::ConvergenceResult;
    use crate::errors::EngineError;
    use crate::test_support::{logs_with_values, snapshot};

    use super::{analyze_prop, check_tally, snapshot_fingerprint};

    #[test]
    fn report_covers_every_view() {
        let snapshot = snapshot(
            "points",
            22.5,
            logs_with_values("points", &[28.0, 26.0, 30.0, 19.0, 29.0, 25.0, 31.0, 21.0, 28.0, 27.0]),
        );

        let report = analyze_prop(&snapshot, &EngineConfig::default()).expect("valid snapshot");

        assert_eq!(report.convergence.roster_size, 7);
        assert!(report.convergence.weighted_factors.is_some());
        assert_eq!(report.heat_ring.aggregates.total_games, 10);
        assert!(report.spectrum.available);
        assert_eq!(report.timeline.points.len(), 10);
        assert!((report.window.hit_rate - 0.8).abs() < 1e-12);
        assert_eq!(report.fingerprint, snapshot_fingerprint(&snapshot));
        assert!((10..=99).contains(&report.verdict.confidence));
    }

    #[test]
    fn invalid_snapshot_is_rejected() {
        let mut snapshot = snapshot("points", 22.5, Vec::new());
        snapshot.stat = String::new();

        assert!(matches!(
            analyze_prop(&snapshot, &EngineConfig::default()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let first = snapshot("points", 22.5, logs_with_values("points", &[20.0]));
        let same = first.clone();
        let mut moved = first.clone();
        moved.line = 23.5;

        assert_eq!(snapshot_fingerprint(&first), snapshot_fingerprint(&same));
        assert_ne!(snapshot_fingerprint(&first), snapshot_fingerprint(&moved));
        assert_eq!(snapshot_fingerprint(&first).len(), 64);
    }

    #[test]
    fn tally_mismatch_is_an_invariant_violation() {
        let broken = ConvergenceResult {
            factors: Vec::new(),
            over_count: 1,
            under_count: 0,
            neutral_count: 0,
            roster_size: 0,
            weighted_factors: None,
        };
        assert!(matches!(check_tally(&broken), Err(EngineError::InvariantViolation(_))));
    }
}
