use crate::config::VerdictPolicy;
use crate::domain::convergence::{ConvergenceResult, Direction, Verdict};

const CONVERGENCE_WEIGHT: f64 = 0.6;
const HIT_RATE_WEIGHT: f64 = 0.4;

/// Blends factor agreement with the trailing hit rate into a labelled call.
///
/// Direction comes from the raw over/under tally alone; the hit rate only
/// moves confidence. A tally within `toss_up_margin` is a toss-up regardless
/// of how confident the blend looks.
pub fn synthesize_verdict(
    result: &ConvergenceResult,
    hit_rate_l10: f64,
    avg_margin_l10: f64,
    season_avg: f64,
    policy: &VerdictPolicy,
) -> Verdict {
    let over = result.over_count as i64;
    let under = result.under_count as i64;
    let direction = if (over - under).unsigned_abs() as usize <= policy.toss_up_margin {
        Direction::TossUp
    } else if over > under {
        Direction::Over
    } else {
        Direction::Under
    };

    let roster = result.roster_size as f64;
    let convergence_strength = if result.roster_size == 0 {
        0.0
    } else {
        result.over_count.max(result.under_count) as f64 / roster * 100.0
    };
    let hit_rate = if hit_rate_l10.is_finite() { hit_rate_l10.clamp(0.0, 1.0) } else { 0.5 };
    let hit_rate_strength = (hit_rate - 0.5).abs() * 200.0;

    let blended = CONVERGENCE_WEIGHT * convergence_strength + HIT_RATE_WEIGHT * hit_rate_strength;
    // Policies built outside the loader are unvalidated; order the bounds.
    let floor = policy.min_confidence.min(policy.max_confidence);
    let ceiling = policy.min_confidence.max(policy.max_confidence).min(100);
    let confidence = blended.round().clamp(f64::from(floor), f64::from(ceiling)) as u8;

    Verdict {
        label: label(direction, confidence, policy),
        direction,
        convergence_score: convergence_score(result),
        confidence,
        hit_rate_l10: hit_rate,
        avg_margin_l10: if avg_margin_l10.is_finite() { avg_margin_l10 } else { 0.0 },
        season_avg: if season_avg.is_finite() { season_avg } else { 0.0 },
    }
}

/// Net agreement in `[-1, 1]`. Strength-weighted when the result carries
/// weights, otherwise the plain tally.
pub fn convergence_score(result: &ConvergenceResult) -> f64 {
    if result.roster_size == 0 {
        return 0.0;
    }
    let roster = result.roster_size as f64;
    let score = match &result.weighted_factors {
        Some(weighted) => weighted.net_strength / roster,
        None => (result.over_count as f64 - result.under_count as f64) / roster,
    };
    score.clamp(-1.0, 1.0)
}

fn label(direction: Direction, confidence: u8, policy: &VerdictPolicy) -> String {
    let side = match direction {
        Direction::TossUp => return "TOSS-UP".to_string(),
        Direction::Over => "OVER",
        Direction::Under => "UNDER",
    };
    let strength = if confidence >= policy.strong_threshold { "STRONG" } else { "LEAN" };
    format!("{strength} {side}")
}
