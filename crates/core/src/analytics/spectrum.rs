//! Kernel density estimate of a player's stat distribution.
//!
//! The estimate uses a Gaussian kernel with Silverman's rule-of-thumb
//! bandwidth. Degenerate samples (a single game, or every game at the same
//! value) fall back to the standard deviation and then to a floor derived
//! from the mean so the curve never collapses to a spike.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::domain::game_log::{stat_samples, DefenseTier, GameLogEntry, StatSample};

const BANDWIDTH_FACTOR: f64 = 0.9;
const IQR_TO_SIGMA: f64 = 1.34;
const GRID_PADDING_BANDWIDTHS: f64 = 3.0;
const MIN_BANDWIDTH: f64 = 0.5;
const MEAN_BANDWIDTH_SHARE: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct SpectrumRequest<'a> {
    pub game_logs: &'a [GameLogEntry],
    pub stat: &'a str,
    pub line: f64,
    pub league_size: u32,
    pub points: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityPoint {
    pub value: f64,
    pub density: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSummary {
    pub games: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayStats {
    pub games: usize,
    pub mean: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumOverlays {
    pub home: OverlayStats,
    pub away: OverlayStats,
    pub vs_top_defense: OverlayStats,
    pub vs_bottom_defense: OverlayStats,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PropSpectrum {
    pub available: bool,
    pub points: Vec<DensityPoint>,
    pub bandwidth: f64,
    pub summary: SpectrumSummary,
    pub line: f64,
    /// Share of games at or below the line.
    pub line_percentile: f64,
    pub prob_over: f64,
    pub overlays: SpectrumOverlays,
}

pub fn compute_spectrum(request: SpectrumRequest<'_>) -> PropSpectrum {
    let samples = stat_samples(request.game_logs, request.stat);
    if samples.is_empty() {
        return PropSpectrum { line: request.line, ..PropSpectrum::default() };
    }

    let mut values: Vec<f64> = samples.iter().map(|sample| sample.value).collect();
    values.sort_by(f64::total_cmp);

    let summary = summarize(&values);
    let bandwidth = silverman_bandwidth(&values, &summary);
    let points = density_grid(&values, bandwidth, &summary, request.points.max(2));

    let at_or_below = values.iter().filter(|value| **value <= request.line).count();
    let line_percentile = at_or_below as f64 / values.len() as f64;
    let prob_over = values
        .iter()
        .map(|value| 1.0 - normal_cdf((request.line - value) / bandwidth))
        .sum::<f64>()
        / values.len() as f64;

    PropSpectrum {
        available: true,
        points,
        bandwidth,
        summary,
        line: request.line,
        line_percentile,
        prob_over: prob_over.clamp(0.0, 1.0),
        overlays: overlays(&samples, request.league_size),
    }
}

fn summarize(sorted: &[f64]) -> SpectrumSummary {
    let games = sorted.len();
    let mean = sorted.iter().sum::<f64>() / games as f64;

    SpectrumSummary {
        games,
        mean,
        median: quantile(sorted, 0.5),
        std_dev: sample_std_dev(sorted, mean),
        min: sorted[0],
        max: sorted[games - 1],
    }
}

fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance =
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn silverman_bandwidth(sorted: &[f64], summary: &SpectrumSummary) -> f64 {
    let n_factor = (sorted.len() as f64).powf(-0.2);
    let iqr = quantile(sorted, 0.75) - quantile(sorted, 0.25);
    let spread = summary.std_dev.min(iqr / IQR_TO_SIGMA);

    let bandwidth = if spread > 0.0 {
        BANDWIDTH_FACTOR * spread * n_factor
    } else if summary.std_dev > 0.0 {
        BANDWIDTH_FACTOR * summary.std_dev * n_factor
    } else {
        0.0
    };

    if bandwidth > 0.0 && bandwidth.is_finite() {
        bandwidth
    } else {
        (summary.mean.abs() * MEAN_BANDWIDTH_SHARE).max(MIN_BANDWIDTH)
    }
}

fn density_grid(
    values: &[f64],
    bandwidth: f64,
    summary: &SpectrumSummary,
    points: usize,
) -> Vec<DensityPoint> {
    let start = summary.min - GRID_PADDING_BANDWIDTHS * bandwidth;
    let end = summary.max + GRID_PADDING_BANDWIDTHS * bandwidth;
    let step = (end - start) / (points - 1) as f64;
    let norm = values.len() as f64 * bandwidth;

    (0..points)
        .map(|index| {
            let value = start + step * index as f64;
            let density = values
                .iter()
                .map(|sample| standard_normal_pdf((value - sample) / bandwidth))
                .sum::<f64>()
                / norm;
            DensityPoint { value, density }
        })
        .collect()
}

fn overlays(samples: &[StatSample<'_>], league_size: u32) -> SpectrumOverlays {
    let observed_max = samples
        .iter()
        .filter_map(|sample| sample.entry.opponent_defense_rank)
        .max()
        .unwrap_or(0);
    let total_teams = league_size.max(observed_max);

    let tier_of = |sample: &StatSample<'_>| {
        sample.entry.opponent_defense_rank.map(|rank| DefenseTier::from_rank(rank, total_teams))
    };

    SpectrumOverlays {
        home: overlay(samples.iter().filter(|sample| sample.entry.is_home)),
        away: overlay(samples.iter().filter(|sample| !sample.entry.is_home)),
        vs_top_defense: overlay(
            samples.iter().filter(|sample| tier_of(sample) == Some(DefenseTier::Top)),
        ),
        vs_bottom_defense: overlay(
            samples.iter().filter(|sample| tier_of(sample) == Some(DefenseTier::Bottom)),
        ),
    }
}

fn overlay<'a, 'b: 'a>(samples: impl Iterator<Item = &'a StatSample<'b>>) -> OverlayStats {
    let (games, total) =
        samples.fold((0usize, 0.0), |(games, total), sample| (games + 1, total + sample.value));
    if games == 0 {
        return OverlayStats::default();
    }
    OverlayStats { games, mean: total / games as f64 }
}

fn standard_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun 7.1.26; absolute error below 1.5e-7.
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}

#[cfg(test)]
mod tests {
    use crate::test_support::logs_with_values;

    use super::{compute_spectrum, normal_cdf, SpectrumRequest};

    fn request<'a>(
        logs: &'a [crate::domain::game_log::GameLogEntry],
        line: f64,
    ) -> SpectrumRequest<'a> {
        SpectrumRequest { game_logs: logs, stat: "points", line, league_size: 30, points: 60 }
    }

    #[test]
    fn empty_history_is_unavailable() {
        let spectrum = compute_spectrum(request(&[], 20.5));

        assert!(!spectrum.available);
        assert!(spectrum.points.is_empty());
        assert_eq!(spectrum.summary.games, 0);
        assert_eq!(spectrum.line, 20.5);
    }

    #[test]
    fn density_integrates_to_roughly_one() {
        let logs = logs_with_values("points", &[18.0, 22.0, 25.0, 19.0, 30.0, 24.0, 21.0, 27.0]);
        let spectrum = compute_spectrum(request(&logs, 22.5));

        assert!(spectrum.available);
        assert_eq!(spectrum.points.len(), 60);
        let step = spectrum.points[1].value - spectrum.points[0].value;
        let area: f64 = spectrum.points.iter().map(|point| point.density * step).sum();
        assert!((area - 1.0).abs() < 0.05, "area was {area}");
        assert!(spectrum.bandwidth > 0.0);
        assert!((spectrum.summary.median - 23.0).abs() < 1e-9);
    }

    #[test]
    fn identical_values_fall_back_to_mean_floor() {
        let logs = logs_with_values("points", &[20.0, 20.0, 20.0]);
        let spectrum = compute_spectrum(request(&logs, 19.5));

        assert!((spectrum.bandwidth - 2.0).abs() < 1e-12);
        assert_eq!(spectrum.line_percentile, 0.0);
        assert!(spectrum.prob_over > 0.5);
    }

    #[test]
    fn single_game_uses_minimum_bandwidth_when_mean_is_small() {
        let logs = logs_with_values("points", &[2.0]);
        let spectrum = compute_spectrum(request(&logs, 1.5));

        assert!((spectrum.bandwidth - 0.5).abs() < 1e-12);
        assert_eq!(spectrum.summary.std_dev, 0.0);
    }

    #[test]
    fn overlays_split_by_venue_and_defense_tier() {
        let mut logs = logs_with_values("points", &[30.0, 10.0, 28.0, 12.0]);
        logs[0].opponent_defense_rank = Some(28);
        logs[1].opponent_defense_rank = Some(2);
        logs[2].opponent_defense_rank = Some(25);

        let spectrum = compute_spectrum(request(&logs, 20.5));

        assert_eq!(spectrum.overlays.home.games, 2);
        assert!((spectrum.overlays.home.mean - 29.0).abs() < 1e-12);
        assert_eq!(spectrum.overlays.away.games, 2);
        assert_eq!(spectrum.overlays.vs_bottom_defense.games, 2);
        assert_eq!(spectrum.overlays.vs_top_defense.games, 1);
        assert!((spectrum.line_percentile - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normal_cdf_matches_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((normal_cdf(-1.0) - 0.158_655).abs() < 1e-4);
    }
}
