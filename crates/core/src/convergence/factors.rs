use crate::analytics::window::{window_stats, windowed_samples};
use crate::config::EngineThresholds;
use crate::domain::convergence::{ConvergenceFactor, Signal};
use crate::domain::game_log::{mean, stat_samples, DefenseTier, GameLogEntry};
use crate::domain::player::same_team;
use crate::domain::snapshot::PropSnapshot;

pub const RECENT_FORM: &str = "recent_form";
pub const SEASON_BASELINE: &str = "season_baseline";
pub const MATCHUP: &str = "matchup";
pub const VENUE_SPLIT: &str = "venue_split";
pub const REST_FATIGUE: &str = "rest_fatigue";
pub const HEAD_TO_HEAD: &str = "head_to_head";
pub const LINE_HISTORY: &str = "line_history";
pub const WEATHER: &str = "weather";
pub const OPPOSING_PITCHER: &str = "opposing_pitcher";
pub const PLATOON_SPLIT: &str = "platoon_split";

/// One independent signal over an immutable snapshot.
///
/// Core evaluators always produce a factor. Extension evaluators return `None`
/// when the context they read is absent so the roster only grows when the
/// orchestrator supplied that context.
pub trait FactorEvaluator: Send + Sync {
    fn key(&self) -> &'static str;

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor>;
}

/// Seven core evaluators followed by the three context extensions.
pub fn standard_roster() -> Vec<Box<dyn FactorEvaluator>> {
    vec![
        Box::new(RecentFormEvaluator),
        Box::new(SeasonBaselineEvaluator),
        Box::new(MatchupEvaluator),
        Box::new(VenueSplitEvaluator),
        Box::new(RestFatigueEvaluator),
        Box::new(HeadToHeadEvaluator),
        Box::new(LineHistoryEvaluator),
        Box::new(WeatherEvaluator),
        Box::new(OpposingPitcherEvaluator),
        Box::new(PlatoonSplitEvaluator),
    ]
}

/// `(value - reference) / reference`, with a zero reference treated as
/// full deviation in the direction of `value`.
fn relative_delta(value: f64, reference: f64) -> f64 {
    if reference.abs() > f64::EPSILON {
        (value - reference) / reference.abs()
    } else if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn sample_confidence(games: usize, full_at: usize) -> f64 {
    (games as f64 / full_at.max(1) as f64).min(1.0)
}

/// Half strength just past the band, full strength at `scale` beyond it.
fn directional_strength(excess: f64, scale: f64, confidence: f64) -> f64 {
    let magnitude = if scale > 0.0 { (excess / scale).clamp(0.0, 1.0) } else { 1.0 };
    (0.5 + 0.5 * magnitude) * confidence
}

#[allow(clippy::too_many_arguments)]
fn banded_factor(
    key: &str,
    name: &str,
    delta: f64,
    band: f64,
    confidence: f64,
    thresholds: &EngineThresholds,
    detail: String,
    data_point: f64,
) -> ConvergenceFactor {
    if delta.abs() < band {
        return ConvergenceFactor::new(
            key,
            name,
            Signal::Neutral,
            thresholds.neutral_strength * confidence,
            detail,
            Some(data_point),
        );
    }
    ConvergenceFactor::new(
        key,
        name,
        Signal::from_delta(delta),
        directional_strength(delta.abs() - band, band * 3.0, confidence),
        detail,
        Some(data_point),
    )
}

/// Over at or above `hit_rate_over`, under at or below `hit_rate_under`,
/// reaching full strength at a perfect (or zero) hit rate.
fn hit_rate_factor(
    key: &str,
    name: &str,
    hit_rate: f64,
    games: usize,
    full_at: usize,
    thresholds: &EngineThresholds,
    detail: String,
) -> ConvergenceFactor {
    let confidence = sample_confidence(games, full_at);
    let (signal, strength) = if hit_rate >= thresholds.hit_rate_over {
        let excess = hit_rate - thresholds.hit_rate_over;
        (Signal::Over, directional_strength(excess, 1.0 - thresholds.hit_rate_over, confidence))
    } else if hit_rate <= thresholds.hit_rate_under {
        let excess = thresholds.hit_rate_under - hit_rate;
        (Signal::Under, directional_strength(excess, thresholds.hit_rate_under, confidence))
    } else {
        (Signal::Neutral, thresholds.neutral_strength * confidence)
    };
    ConvergenceFactor::new(key, name, signal, strength, detail, Some(hit_rate))
}

fn pct(value: f64) -> String {
    format!("{:+.1}%", value * 100.0)
}

pub struct RecentFormEvaluator;

impl FactorEvaluator for RecentFormEvaluator {
    fn key(&self) -> &'static str {
        RECENT_FORM
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Recent Form";
        let recent =
            windowed_samples(&snapshot.game_logs, &snapshot.stat, Some(thresholds.recent_window));
        let season = snapshot.season();
        if recent.len() < thresholds.min_sample || (season.games as usize) < thresholds.min_sample
        {
            return Some(ConvergenceFactor::insufficient(
                RECENT_FORM,
                name,
                format!("Only {} recent games on record", recent.len()),
            ));
        }

        let recent_avg = mean(recent.iter().map(|sample| sample.value)).unwrap_or(0.0);
        let delta = relative_delta(recent_avg, season.average);
        Some(banded_factor(
            RECENT_FORM,
            name,
            delta,
            thresholds.trend_band,
            sample_confidence(recent.len(), thresholds.recent_window),
            thresholds,
            format!(
                "L{} average {:.1} vs season {:.1} ({})",
                recent.len(),
                recent_avg,
                season.average,
                pct(delta)
            ),
            recent_avg,
        ))
    }
}

pub struct SeasonBaselineEvaluator;

impl FactorEvaluator for SeasonBaselineEvaluator {
    fn key(&self) -> &'static str {
        SEASON_BASELINE
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Season Baseline";
        let season = snapshot.season();
        let games = season.games as usize;
        if games < thresholds.min_sample {
            return Some(ConvergenceFactor::insufficient(
                SEASON_BASELINE,
                name,
                format!("Only {games} season games on record"),
            ));
        }

        let delta = relative_delta(season.average, snapshot.line);
        Some(banded_factor(
            SEASON_BASELINE,
            name,
            delta,
            thresholds.baseline_band,
            sample_confidence(games, thresholds.season_full_sample),
            thresholds,
            format!(
                "Season average {:.1} vs line {} ({})",
                season.average,
                snapshot.line,
                pct(delta)
            ),
            season.average,
        ))
    }
}

pub struct MatchupEvaluator;

impl FactorEvaluator for MatchupEvaluator {
    fn key(&self) -> &'static str {
        MATCHUP
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Matchup";
        let Some(ranking) = &snapshot.defense_ranking else {
            return Some(ConvergenceFactor::insufficient(
                MATCHUP,
                name,
                format!("No defensive ranking for {}", snapshot.opponent()),
            ));
        };

        let total = ranking.total_teams.max(ranking.rank).max(2) as f64;
        let midpoint = (total + 1.0) / 2.0;
        let extremity = ((ranking.rank as f64 - midpoint).abs() / (midpoint - 1.0)).min(1.0);
        let (signal, strength, verb) = match ranking.tier() {
            DefenseTier::Top => (Signal::Under, 0.5 + 0.5 * extremity, "stingy"),
            DefenseTier::Bottom => (Signal::Over, 0.5 + 0.5 * extremity, "generous"),
            DefenseTier::Middle => (Signal::Neutral, thresholds.neutral_strength, "average"),
        };

        Some(ConvergenceFactor::new(
            MATCHUP,
            name,
            signal,
            strength,
            format!(
                "{} ranks {} against {} ({verb})",
                snapshot.opponent(),
                ranking.display_label(),
                snapshot.stat
            ),
            Some(ranking.rank as f64),
        ))
    }
}

pub struct VenueSplitEvaluator;

impl FactorEvaluator for VenueSplitEvaluator {
    fn key(&self) -> &'static str {
        VENUE_SPLIT
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Venue Split";
        let is_home = snapshot.is_home();
        let venue = if is_home { "home" } else { "away" };
        let split: Vec<f64> = stat_samples(&snapshot.game_logs, &snapshot.stat)
            .into_iter()
            .filter(|sample| sample.entry.is_home == is_home)
            .map(|sample| sample.value)
            .collect();

        if split.len() < thresholds.min_sample {
            return Some(ConvergenceFactor::insufficient(
                VENUE_SPLIT,
                name,
                format!("Only {} {venue} games on record", split.len()),
            ));
        }

        let split_avg = mean(split.iter().copied()).unwrap_or(0.0);
        let delta = relative_delta(split_avg, snapshot.line);
        Some(banded_factor(
            VENUE_SPLIT,
            name,
            delta,
            thresholds.baseline_band,
            sample_confidence(split.len(), thresholds.split_full_sample),
            thresholds,
            format!(
                "{} {venue} average {:.1} vs line {} ({})",
                split.len(),
                split_avg,
                snapshot.line,
                pct(delta)
            ),
            split_avg,
        ))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RestBucket {
    BackToBack,
    OneDay,
    Rested,
}

impl RestBucket {
    fn of(rest_days: u32, is_back_to_back: bool) -> Self {
        if is_back_to_back || rest_days == 0 {
            Self::BackToBack
        } else if rest_days == 1 {
            Self::OneDay
        } else {
            Self::Rested
        }
    }

    fn of_entry(entry: &GameLogEntry) -> Self {
        Self::of(entry.rest_days, entry.is_back_to_back)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::BackToBack => "back-to-back",
            Self::OneDay => "one day of rest",
            Self::Rested => "two or more days of rest",
        }
    }
}

pub struct RestFatigueEvaluator;

impl FactorEvaluator for RestFatigueEvaluator {
    fn key(&self) -> &'static str {
        REST_FATIGUE
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Rest & Fatigue";
        let Some(rest_days) = snapshot.rest_days() else {
            return Some(ConvergenceFactor::insufficient(
                REST_FATIGUE,
                name,
                "No rest data for this game",
            ));
        };
        let today = RestBucket::of(rest_days, snapshot.is_back_to_back());
        let samples = stat_samples(&snapshot.game_logs, &snapshot.stat);
        let bucket: Vec<f64> = samples
            .iter()
            .filter(|sample| RestBucket::of_entry(sample.entry) == today)
            .map(|sample| sample.value)
            .collect();

        if bucket.len() < thresholds.min_sample {
            return Some(ConvergenceFactor::insufficient(
                REST_FATIGUE,
                name,
                format!("Only {} games on {}", bucket.len(), today.label()),
            ));
        }

        let overall = mean(samples.iter().map(|sample| sample.value)).unwrap_or(0.0);
        let bucket_avg = mean(bucket.iter().copied()).unwrap_or(0.0);
        let mut delta = relative_delta(bucket_avg, overall);
        if today == RestBucket::BackToBack {
            delta -= thresholds.back_to_back_penalty;
        }

        Some(banded_factor(
            REST_FATIGUE,
            name,
            delta,
            thresholds.trend_band,
            sample_confidence(bucket.len(), thresholds.split_full_sample),
            thresholds,
            format!(
                "Averages {:.1} on {} vs {:.1} overall ({})",
                bucket_avg,
                today.label(),
                overall,
                pct(delta)
            ),
            bucket_avg,
        ))
    }
}

pub struct HeadToHeadEvaluator;

impl FactorEvaluator for HeadToHeadEvaluator {
    fn key(&self) -> &'static str {
        HEAD_TO_HEAD
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Head to Head";
        let opponent = snapshot.opponent();
        let meetings: Vec<f64> = stat_samples(&snapshot.game_logs, &snapshot.stat)
            .into_iter()
            .filter(|sample| same_team(&sample.entry.opponent, opponent))
            .map(|sample| sample.value)
            .collect();

        if meetings.len() < thresholds.h2h_min_meetings {
            return Some(ConvergenceFactor::insufficient(
                HEAD_TO_HEAD,
                name,
                format!("Only {} meetings with {opponent}", meetings.len()),
            ));
        }

        let hits = meetings.iter().filter(|value| **value > snapshot.line).count();
        let rate = hits as f64 / meetings.len() as f64;
        Some(hit_rate_factor(
            HEAD_TO_HEAD,
            name,
            rate,
            meetings.len(),
            thresholds.meetings_full_sample,
            thresholds,
            format!("Cleared {} in {hits} of {} games vs {opponent}", snapshot.line, meetings.len()),
        ))
    }
}

pub struct LineHistoryEvaluator;

impl FactorEvaluator for LineHistoryEvaluator {
    fn key(&self) -> &'static str {
        LINE_HISTORY
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let name = "Line History";
        let stats = window_stats(
            &snapshot.game_logs,
            &snapshot.stat,
            snapshot.line,
            Some(thresholds.line_history_window),
        );
        if stats.games_in_window < thresholds.min_sample {
            return Some(ConvergenceFactor::insufficient(
                LINE_HISTORY,
                name,
                format!("Only {} games against this line", stats.games_in_window),
            ));
        }

        let hits = (stats.hit_rate * stats.games_in_window as f64).round() as usize;
        Some(hit_rate_factor(
            LINE_HISTORY,
            name,
            stats.hit_rate,
            stats.games_in_window,
            thresholds.line_history_window,
            thresholds,
            format!(
                "Over {} in {hits} of last {} games (avg margin {:+.1})",
                snapshot.line, stats.games_in_window, stats.avg_margin
            ),
        ))
    }
}

pub struct WeatherEvaluator;

impl FactorEvaluator for WeatherEvaluator {
    fn key(&self) -> &'static str {
        WEATHER
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let weather = snapshot.extra.weather.as_ref()?;
        let cutoffs = &thresholds.weather;
        let name = "Weather";

        if weather.is_dome {
            return Some(ConvergenceFactor::new(
                WEATHER,
                name,
                Signal::Neutral,
                thresholds.neutral_strength,
                "Indoor venue, weather not a factor",
                None,
            ));
        }

        let wind =
            ((weather.wind_mph - cutoffs.wind_floor_mph) / cutoffs.wind_span_mph).clamp(0.0, 1.0);
        let cold = ((cutoffs.cold_ceiling_f - weather.temperature_f) / cutoffs.cold_span_f)
            .clamp(0.0, 1.0);
        let rain = ((weather.precipitation_pct - cutoffs.rain_floor_pct) / cutoffs.rain_span_pct)
            .clamp(0.0, 1.0);
        let severity = wind.max(cold).max(rain);
        let detail = format!(
            "{:.0}°F, wind {:.0} mph, {:.0}% precipitation",
            weather.temperature_f, weather.wind_mph, weather.precipitation_pct
        );

        if severity > cutoffs.severity_threshold {
            return Some(ConvergenceFactor::new(
                WEATHER,
                name,
                Signal::Under,
                0.4 + 0.6 * severity,
                detail,
                Some(severity),
            ));
        }

        if weather.temperature_f >= cutoffs.warm_floor_f
            && weather.wind_mph <= cutoffs.calm_wind_mph
            && weather.precipitation_pct < cutoffs.dry_precip_pct
        {
            let warmth =
                ((weather.temperature_f - cutoffs.warm_floor_f) / cutoffs.warm_span_f).clamp(0.0, 1.0);
            return Some(ConvergenceFactor::new(
                WEATHER,
                name,
                Signal::Over,
                0.4 + 0.2 * warmth,
                detail,
                Some(severity),
            ));
        }

        Some(ConvergenceFactor::new(
            WEATHER,
            name,
            Signal::Neutral,
            thresholds.neutral_strength,
            detail,
            Some(severity),
        ))
    }
}

pub struct OpposingPitcherEvaluator;

impl FactorEvaluator for OpposingPitcherEvaluator {
    fn key(&self) -> &'static str {
        OPPOSING_PITCHER
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let pitcher = snapshot.extra.opposing_pitcher.as_ref()?;
        let name = "Opposing Pitcher";

        if !pitcher.era.is_finite() || pitcher.innings_pitched < thresholds.pitcher_min_innings {
            return Some(ConvergenceFactor::insufficient(
                OPPOSING_PITCHER,
                name,
                format!("{} has only {:.1} innings pitched", pitcher.name, pitcher.innings_pitched),
            ));
        }

        let confidence = (pitcher.innings_pitched / thresholds.pitcher_full_innings).min(1.0);
        let whip = pitcher.whip.filter(|whip| whip.is_finite());
        let detail = match whip {
            Some(whip) => format!("{} ERA {:.2}, WHIP {:.2}", pitcher.name, pitcher.era, whip),
            None => format!("{} ERA {:.2}", pitcher.name, pitcher.era),
        };

        let (signal, excess, whip_agrees) = if pitcher.era >= thresholds.hitter_friendly_era {
            (
                Signal::Over,
                pitcher.era - thresholds.hitter_friendly_era,
                whip.is_some_and(|whip| whip >= thresholds.loose_whip),
            )
        } else if pitcher.era <= thresholds.pitcher_friendly_era {
            (
                Signal::Under,
                thresholds.pitcher_friendly_era - pitcher.era,
                whip.is_some_and(|whip| whip <= thresholds.tight_whip),
            )
        } else {
            return Some(ConvergenceFactor::new(
                OPPOSING_PITCHER,
                name,
                Signal::Neutral,
                thresholds.neutral_strength * confidence,
                detail,
                Some(pitcher.era),
            ));
        };

        let mut strength = directional_strength(excess, thresholds.era_strength_span, confidence);
        if whip_agrees {
            strength += thresholds.whip_agreement_bonus;
        }
        Some(ConvergenceFactor::new(OPPOSING_PITCHER, name, signal, strength, detail, Some(pitcher.era)))
    }
}

pub struct PlatoonSplitEvaluator;

impl FactorEvaluator for PlatoonSplitEvaluator {
    fn key(&self) -> &'static str {
        PLATOON_SPLIT
    }

    fn evaluate(
        &self,
        snapshot: &PropSnapshot,
        thresholds: &EngineThresholds,
    ) -> Option<ConvergenceFactor> {
        let platoon = snapshot.extra.platoon.as_ref()?;
        let name = "Platoon Split";

        if platoon.plate_appearances < thresholds.platoon_min_plate_appearances {
            return Some(ConvergenceFactor::insufficient(
                PLATOON_SPLIT,
                name,
                format!("Only {} plate appearances in this split", platoon.plate_appearances),
            ));
        }

        let delta = relative_delta(platoon.split_average, platoon.overall_average);
        let full_at = thresholds.platoon_full_plate_appearances as usize;
        Some(banded_factor(
            PLATOON_SPLIT,
            name,
            delta,
            thresholds.trend_band,
            sample_confidence(platoon.plate_appearances as usize, full_at),
            thresholds,
            format!(
                "Split average {:.3} vs {:.3} overall over {} PA ({})",
                platoon.split_average,
                platoon.overall_average,
                platoon.plate_appearances,
                pct(delta)
            ),
            platoon.split_average,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::EngineThresholds;
    use crate::domain::convergence::Signal;
    use crate::domain::game_log::DefenseRanking;
    use crate::domain::snapshot::{Hand, PitcherContext, PlatoonSplit, WeatherContext};
    use crate::test_support::{logs_with_values, snapshot};

    use super::{
        standard_roster, FactorEvaluator, HeadToHeadEvaluator, LineHistoryEvaluator,
        MatchupEvaluator, OpposingPitcherEvaluator, PlatoonSplitEvaluator, RecentFormEvaluator,
        RestFatigueEvaluator, SeasonBaselineEvaluator, WeatherEvaluator,
    };

    #[test]
    fn roster_lists_core_factors_before_extensions() {
        let keys: Vec<&str> = standard_roster().iter().map(|evaluator| evaluator.key()).collect();
        assert_eq!(
            keys,
            vec![
                "recent_form",
                "season_baseline",
                "matchup",
                "venue_split",
                "rest_fatigue",
                "head_to_head",
                "line_history",
                "weather",
                "opposing_pitcher",
                "platoon_split",
            ]
        );
    }

    #[test]
    fn recent_surge_reads_over() {
        let mut values = vec![30.0; 5];
        values.extend(vec![18.0; 10]);
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &values));

        let factor = RecentFormEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(factor.signal, Signal::Over);
        assert!(factor.strength > 0.5);
        assert_eq!(factor.data_point, Some(30.0));
    }

    #[test]
    fn thin_history_is_neutral_at_zero_strength() {
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &[30.0, 31.0]));
        let thresholds = EngineThresholds::default();

        for evaluator in standard_roster() {
            if let Some(factor) = evaluator.evaluate(&snapshot, &thresholds) {
                assert_eq!(factor.signal, Signal::Neutral, "{} should be neutral", factor.key);
                assert_eq!(factor.strength, 0.0, "{} should carry no weight", factor.key);
            }
        }
    }

    #[test]
    fn season_average_near_line_is_neutral() {
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &[22.0, 23.0, 23.0, 22.0]));

        let factor = SeasonBaselineEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(factor.signal, Signal::Neutral);
        assert!(factor.strength > 0.0);
    }

    #[test]
    fn matchup_follows_defensive_tertiles() {
        let thresholds = EngineThresholds::default();
        let mut snapshot = snapshot("points", 22.5, Vec::new());

        snapshot.defense_ranking = Some(DefenseRanking { rank: 2, total_teams: 30, label: None });
        let stingy = MatchupEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(stingy.signal, Signal::Under);

        snapshot.defense_ranking = Some(DefenseRanking { rank: 29, total_teams: 30, label: None });
        let generous = MatchupEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(generous.signal, Signal::Over);

        snapshot.defense_ranking = Some(DefenseRanking { rank: 15, total_teams: 30, label: None });
        let average = MatchupEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(average.signal, Signal::Neutral);

        snapshot.defense_ranking = None;
        let missing = MatchupEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(missing.strength, 0.0);
    }

    #[test]
    fn back_to_back_penalty_pushes_under() {
        let mut logs = logs_with_values("points", &[20.0; 8]);
        for entry in logs.iter_mut().take(4) {
            entry.is_back_to_back = true;
            entry.rest_days = 0;
        }
        let mut snapshot = snapshot("points", 19.5, logs);
        snapshot.is_back_to_back = Some(true);

        let factor = RestFatigueEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(factor.signal, Signal::Under);
    }

    #[test]
    fn unknown_rest_is_insufficient_rather_than_one_day() {
        let mut logs = logs_with_values("points", &[14.0; 8]);
        for entry in logs.iter_mut().take(4) {
            entry.rest_days = 3;
        }
        let mut snapshot = snapshot("points", 19.5, logs);
        snapshot.rest_days = None;
        snapshot.is_back_to_back = None;

        let factor = RestFatigueEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(factor.signal, Signal::Neutral);
        assert_eq!(factor.strength, 0.0);
        assert_eq!(factor.detail, "No rest data for this game");
    }

    #[test]
    fn hit_rate_cutoffs_follow_thresholds() {
        let values = [25.0, 25.0, 25.0, 20.0, 20.0];
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &values));

        let default_read = LineHistoryEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(default_read.signal, Signal::Over);

        let strict = EngineThresholds { hit_rate_over: 0.7, ..EngineThresholds::default() };
        let strict_read = LineHistoryEvaluator.evaluate(&snapshot, &strict).expect("core factor");
        assert_eq!(strict_read.signal, Signal::Neutral);
        assert!((strict_read.strength - strict.neutral_strength * 0.5).abs() < 1e-12);
    }

    #[test]
    fn weather_cutoffs_follow_thresholds() {
        let mut snapshot = snapshot("hits", 0.5, Vec::new());
        snapshot.extra.weather = Some(WeatherContext {
            temperature_f: 68.0,
            wind_mph: 16.0,
            precipitation_pct: 0.0,
            is_dome: false,
        });

        let breezy = WeatherEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("weather context");
        assert_eq!(breezy.signal, Signal::Under);

        let mut sheltered = EngineThresholds::default();
        sheltered.weather.wind_floor_mph = 18.0;
        let calm = WeatherEvaluator.evaluate(&snapshot, &sheltered).expect("weather context");
        assert_eq!(calm.signal, Signal::Neutral);
        assert_eq!(calm.data_point, Some(0.0));
    }

    #[test]
    fn head_to_head_needs_minimum_meetings() {
        let mut logs = logs_with_values("points", &[30.0, 29.0, 28.0, 27.0, 12.0]);
        for entry in &mut logs {
            entry.opponent = "LAL".to_string();
        }
        for entry in logs.iter_mut().take(2) {
            entry.opponent = "PHX".to_string();
        }
        let snapshot = snapshot("points", 22.5, logs.clone());
        let thresholds = EngineThresholds::default();

        let thin = HeadToHeadEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(thin.strength, 0.0);

        logs[2].opponent = "phx".to_string();
        let snapshot = crate::test_support::snapshot("points", 22.5, logs);
        let factor = HeadToHeadEvaluator.evaluate(&snapshot, &thresholds).expect("core factor");
        assert_eq!(factor.signal, Signal::Over);
        assert_eq!(factor.data_point, Some(1.0));
    }

    #[test]
    fn line_history_uses_last_ten_games() {
        let mut values = vec![15.0; 10];
        values.extend(vec![40.0; 10]);
        let snapshot = snapshot("points", 22.5, logs_with_values("points", &values));

        let factor = LineHistoryEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("core factor");
        assert_eq!(factor.signal, Signal::Under);
        assert_eq!(factor.data_point, Some(0.0));
    }

    #[test]
    fn extensions_are_omitted_without_context() {
        let snapshot = snapshot("hits", 0.5, logs_with_values("hits", &[1.0, 0.0, 2.0]));
        let thresholds = EngineThresholds::default();

        assert!(WeatherEvaluator.evaluate(&snapshot, &thresholds).is_none());
        assert!(OpposingPitcherEvaluator.evaluate(&snapshot, &thresholds).is_none());
        assert!(PlatoonSplitEvaluator.evaluate(&snapshot, &thresholds).is_none());
    }

    #[test]
    fn extensions_read_their_context() {
        let thresholds = EngineThresholds::default();
        let mut snapshot = snapshot("hits", 0.5, logs_with_values("hits", &[1.0, 0.0, 2.0]));
        snapshot.extra.weather = Some(WeatherContext {
            temperature_f: 41.0,
            wind_mph: 22.0,
            precipitation_pct: 10.0,
            is_dome: false,
        });
        snapshot.extra.opposing_pitcher = Some(PitcherContext {
            name: "Starter".to_string(),
            throws: Hand::Left,
            era: 5.40,
            whip: Some(1.52),
            innings_pitched: 88.0,
        });
        snapshot.extra.platoon = Some(PlatoonSplit {
            vs_hand: Hand::Left,
            split_average: 0.310,
            overall_average: 0.260,
            plate_appearances: 140,
        });

        let weather = WeatherEvaluator.evaluate(&snapshot, &thresholds).expect("weather context");
        assert_eq!(weather.signal, Signal::Under);

        let pitcher =
            OpposingPitcherEvaluator.evaluate(&snapshot, &thresholds).expect("pitcher context");
        assert_eq!(pitcher.signal, Signal::Over);
        assert!(pitcher.strength > 0.7);

        let platoon = PlatoonSplitEvaluator.evaluate(&snapshot, &thresholds).expect("platoon");
        assert_eq!(platoon.signal, Signal::Over);

        if let Some(weather) = snapshot.extra.weather.as_mut() {
            weather.is_dome = true;
        }
        let dome = WeatherEvaluator.evaluate(&snapshot, &thresholds).expect("weather context");
        assert_eq!(dome.signal, Signal::Neutral);
    }

    #[test]
    fn short_pitcher_sample_is_insufficient() {
        let mut snapshot = snapshot("hits", 0.5, Vec::new());
        snapshot.extra.opposing_pitcher = Some(PitcherContext {
            name: "Call-up".to_string(),
            throws: Hand::Right,
            era: 1.80,
            whip: None,
            innings_pitched: 9.0,
        });

        let factor = OpposingPitcherEvaluator
            .evaluate(&snapshot, &EngineThresholds::default())
            .expect("pitcher context");
        assert_eq!(factor.signal, Signal::Neutral);
        assert_eq!(factor.strength, 0.0);
    }
}
