use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use propline_core::config::{detect_config_path, AppConfig, ConfigOverrides};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct EffectiveConfig {
    pub precedence: &'static str,
    pub config_file: Option<String>,
    pub entries: Vec<ConfigEntry>,
}

/// One reported setting: its dotted file key, the effective value, the env
/// variables the loader reads for it (first set one wins), and the override
/// that can replace it together with whether that override was supplied.
struct FieldSpec {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    flag: Option<(&'static str, bool)>,
}

fn field(
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    flag: Option<(&'static str, bool)>,
) -> FieldSpec {
    FieldSpec { key, value, env_keys, flag }
}

pub fn run(
    config: &AppConfig,
    explicit_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> CommandResult {
    CommandResult::success("config", &effective_config(config, explicit_path, overrides), true)
}

pub fn effective_config(
    config: &AppConfig,
    explicit_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> EffectiveConfig {
    let config_file_path: Option<PathBuf> =
        explicit_path.map(Path::to_path_buf).or_else(detect_config_path);
    let config_file_doc =
        config_file_path.as_deref().and_then(|path| load_config_file_doc(path).ok());
    let engine = &config.engine;
    let thresholds = &engine.thresholds;

    let fields = vec![
        field(
            "thresholds.min_sample",
            thresholds.min_sample.to_string(),
            &["PROPLINE_THRESHOLDS_MIN_SAMPLE"],
            None,
        ),
        field(
            "thresholds.trend_band",
            thresholds.trend_band.to_string(),
            &["PROPLINE_THRESHOLDS_TREND_BAND"],
            None,
        ),
        field("thresholds.baseline_band", thresholds.baseline_band.to_string(), &[], None),
        field("thresholds.recent_window", thresholds.recent_window.to_string(), &[], None),
        field("thresholds.h2h_min_meetings", thresholds.h2h_min_meetings.to_string(), &[], None),
        field(
            "thresholds.back_to_back_penalty",
            thresholds.back_to_back_penalty.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.pitcher_min_innings",
            thresholds.pitcher_min_innings.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.platoon_min_plate_appearances",
            thresholds.platoon_min_plate_appearances.to_string(),
            &[],
            None,
        ),
        field("thresholds.teammate_min_with", thresholds.teammate_min_with.to_string(), &[], None),
        field(
            "thresholds.teammate_min_without",
            thresholds.teammate_min_without.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.impact_dead_zone",
            thresholds.impact_dead_zone.to_string(),
            &["PROPLINE_THRESHOLDS_IMPACT_DEAD_ZONE"],
            None,
        ),
        field(
            "thresholds.league_size",
            thresholds.league_size.to_string(),
            &["PROPLINE_THRESHOLDS_LEAGUE_SIZE"],
            Some(("--league-size", overrides.league_size.is_some())),
        ),
        field(
            "thresholds.season_full_sample",
            thresholds.season_full_sample.to_string(),
            &[],
            None,
        ),
        field("thresholds.split_full_sample", thresholds.split_full_sample.to_string(), &[], None),
        field(
            "thresholds.meetings_full_sample",
            thresholds.meetings_full_sample.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.line_history_window",
            thresholds.line_history_window.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.hit_rate_over",
            thresholds.hit_rate_over.to_string(),
            &["PROPLINE_THRESHOLDS_HIT_RATE_OVER"],
            None,
        ),
        field(
            "thresholds.hit_rate_under",
            thresholds.hit_rate_under.to_string(),
            &["PROPLINE_THRESHOLDS_HIT_RATE_UNDER"],
            None,
        ),
        field(
            "thresholds.neutral_strength",
            thresholds.neutral_strength.to_string(),
            &["PROPLINE_THRESHOLDS_NEUTRAL_STRENGTH"],
            None,
        ),
        field(
            "thresholds.hitter_friendly_era",
            thresholds.hitter_friendly_era.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.pitcher_friendly_era",
            thresholds.pitcher_friendly_era.to_string(),
            &[],
            None,
        ),
        field("thresholds.era_strength_span", thresholds.era_strength_span.to_string(), &[], None),
        field("thresholds.loose_whip", thresholds.loose_whip.to_string(), &[], None),
        field("thresholds.tight_whip", thresholds.tight_whip.to_string(), &[], None),
        field(
            "thresholds.whip_agreement_bonus",
            thresholds.whip_agreement_bonus.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.pitcher_full_innings",
            thresholds.pitcher_full_innings.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.platoon_full_plate_appearances",
            thresholds.platoon_full_plate_appearances.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.wind_floor_mph",
            thresholds.weather.wind_floor_mph.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.wind_span_mph",
            thresholds.weather.wind_span_mph.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.cold_ceiling_f",
            thresholds.weather.cold_ceiling_f.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.cold_span_f",
            thresholds.weather.cold_span_f.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.rain_floor_pct",
            thresholds.weather.rain_floor_pct.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.rain_span_pct",
            thresholds.weather.rain_span_pct.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.severity_threshold",
            thresholds.weather.severity_threshold.to_string(),
            &["PROPLINE_WEATHER_SEVERITY_THRESHOLD"],
            None,
        ),
        field(
            "thresholds.weather.warm_floor_f",
            thresholds.weather.warm_floor_f.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.warm_span_f",
            thresholds.weather.warm_span_f.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.calm_wind_mph",
            thresholds.weather.calm_wind_mph.to_string(),
            &[],
            None,
        ),
        field(
            "thresholds.weather.dry_precip_pct",
            thresholds.weather.dry_precip_pct.to_string(),
            &[],
            None,
        ),
        field("verdict.toss_up_margin", engine.verdict.toss_up_margin.to_string(), &[], None),
        field(
            "verdict.strong_threshold",
            engine.verdict.strong_threshold.to_string(),
            &["PROPLINE_VERDICT_STRONG_THRESHOLD"],
            None,
        ),
        field(
            "verdict.hit_rate_window",
            engine.verdict.hit_rate_window.to_string(),
            &["PROPLINE_VERDICT_HIT_RATE_WINDOW"],
            None,
        ),
        field("verdict.min_confidence", engine.verdict.min_confidence.to_string(), &[], None),
        field("verdict.max_confidence", engine.verdict.max_confidence.to_string(), &[], None),
        field(
            "windows.heat_ring_games",
            engine.windows.heat_ring_games.to_string(),
            &["PROPLINE_WINDOWS_HEAT_RING_GAMES"],
            Some(("--max-games", overrides.heat_ring_games.is_some())),
        ),
        field(
            "windows.moving_average_window",
            engine.windows.moving_average_window.to_string(),
            &["PROPLINE_WINDOWS_MOVING_AVERAGE_WINDOW"],
            None,
        ),
        field("windows.spectrum_points", engine.windows.spectrum_points.to_string(), &[], None),
        field("narrative.streak_length", engine.narrative.streak_length.to_string(), &[], None),
        field(
            "narrative.extended_rest_days",
            engine.narrative.extended_rest_days.to_string(),
            &[],
            None,
        ),
        field(
            "narrative.bounce_back_margin_pct",
            engine.narrative.bounce_back_margin_pct.to_string(),
            &[],
            None,
        ),
        field(
            "narrative.inflated_line_pct",
            engine.narrative.inflated_line_pct.to_string(),
            &[],
            None,
        ),
        field(
            "similar.min_games",
            engine.similar.min_games.to_string(),
            &["PROPLINE_SIMILAR_MIN_GAMES"],
            None,
        ),
        field(
            "similar.min_similarity",
            engine.similar.min_similarity.to_string(),
            &["PROPLINE_SIMILAR_MIN_SIMILARITY"],
            None,
        ),
        field("similar.max_games", engine.similar.max_games.to_string(), &[], None),
        field("similar.tier_weight", engine.similar.tier_weight.to_string(), &[], None),
        field("similar.venue_weight", engine.similar.venue_weight.to_string(), &[], None),
        field("similar.rest_weight", engine.similar.rest_weight.to_string(), &[], None),
        field("similar.rest_penalty_cap", engine.similar.rest_penalty_cap.to_string(), &[], None),
        field("similar.max_rest_bucket", engine.similar.max_rest_bucket.to_string(), &[], None),
        field(
            "simulator.max_modifications",
            engine.simulator.max_modifications.to_string(),
            &["PROPLINE_SIMULATOR_MAX_MODIFICATIONS"],
            None,
        ),
        field(
            "cache.ttl_secs",
            config.cache.ttl_secs.to_string(),
            &["PROPLINE_CACHE_TTL_SECS"],
            Some(("--cache-ttl-secs", overrides.cache_ttl_secs.is_some())),
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["PROPLINE_LOGGING_LEVEL", "PROPLINE_LOG_LEVEL"],
            Some(("--log-level", overrides.log_level.is_some())),
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["PROPLINE_LOGGING_FORMAT", "PROPLINE_LOG_FORMAT"],
            Some(("--log-format", overrides.log_format.is_some())),
        ),
    ];

    let entries = fields
        .into_iter()
        .map(|field_spec| ConfigEntry {
            key: field_spec.key,
            source: field_source(&field_spec, config_file_doc.as_ref(), config_file_path.as_deref()),
            value: field_spec.value,
        })
        .collect();

    EffectiveConfig {
        precedence: "flag > env > file > default",
        config_file: config_file_path.map(|path| path.display().to_string()),
        entries,
    }
}

fn load_config_file_doc(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    raw.parse::<Value>().with_context(|| format!("parsing config file {}", path.display()))
}

fn field_source(
    field_spec: &FieldSpec,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some((flag, true)) = field_spec.flag {
        return format!("flag ({flag})");
    }

    // Blank values are ignored by the loader, so they do not count as set.
    let env_key = field_spec
        .env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = env_key {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field_spec.key) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}
