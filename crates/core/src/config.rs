use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "propline.toml";
pub const NESTED_CONFIG_FILE: &str = "config/propline.toml";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Every tunable the scoring engine reads. Passed explicitly into each
/// computation; the engine never reads configuration on its own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub thresholds: EngineThresholds,
    pub verdict: VerdictPolicy,
    pub windows: WindowConfig,
    pub narrative: NarrativeConfig,
    pub similar: SimilarConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineThresholds {
    /// Games an evaluator needs before it may emit a directional call.
    pub min_sample: usize,
    /// Relative deviation below which a trend reads as neutral.
    pub trend_band: f64,
    /// Relative gap between season average and line below which the baseline reads as neutral.
    pub baseline_band: f64,
    pub recent_window: usize,
    pub h2h_min_meetings: usize,
    /// Extra under-strength applied on the second night of a back-to-back.
    pub back_to_back_penalty: f64,
    pub pitcher_min_innings: f64,
    pub platoon_min_plate_appearances: u32,
    pub teammate_min_with: usize,
    pub teammate_min_without: usize,
    pub impact_dead_zone: f64,
    pub league_size: u32,
    /// Games at which a season-long average reaches full confidence.
    pub season_full_sample: usize,
    /// Games at which a venue or rest split reaches full confidence.
    pub split_full_sample: usize,
    pub meetings_full_sample: usize,
    pub line_history_window: usize,
    /// Hit rate at or above which a hit-rate factor leans over.
    pub hit_rate_over: f64,
    /// Hit rate at or below which a hit-rate factor leans under.
    pub hit_rate_under: f64,
    /// Strength carried by an in-band neutral read at full confidence.
    pub neutral_strength: f64,
    pub hitter_friendly_era: f64,
    pub pitcher_friendly_era: f64,
    /// ERA distance past a cutoff at which the pitcher read is full strength.
    pub era_strength_span: f64,
    pub loose_whip: f64,
    pub tight_whip: f64,
    /// Added when WHIP agrees with the ERA call.
    pub whip_agreement_bonus: f64,
    pub pitcher_full_innings: f64,
    pub platoon_full_plate_appearances: u32,
    pub weather: WeatherThresholds,
}

/// Outdoor conditions. Each adverse reading scales from 0 at its floor to 1
/// one span past it; the worst one is the game's severity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherThresholds {
    pub wind_floor_mph: f64,
    pub wind_span_mph: f64,
    pub cold_ceiling_f: f64,
    pub cold_span_f: f64,
    pub rain_floor_pct: f64,
    pub rain_span_pct: f64,
    /// Severity above which conditions lean under.
    pub severity_threshold: f64,
    pub warm_floor_f: f64,
    pub warm_span_f: f64,
    pub calm_wind_mph: f64,
    pub dry_precip_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictPolicy {
    pub toss_up_margin: usize,
    pub strong_threshold: u8,
    pub hit_rate_window: usize,
    pub min_confidence: u8,
    pub max_confidence: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub heat_ring_games: usize,
    pub moving_average_window: usize,
    pub spectrum_points: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrativeConfig {
    pub streak_length: i32,
    pub extended_rest_days: u32,
    pub bounce_back_margin_pct: f64,
    pub inflated_line_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarConfig {
    pub min_games: usize,
    pub min_similarity: f64,
    pub max_games: usize,
    pub tier_weight: f64,
    pub venue_weight: f64,
    /// Distance per rest bucket apart, capped at `rest_penalty_cap`.
    pub rest_weight: f64,
    pub rest_penalty_cap: f64,
    /// Highest rest bucket; longer rest folds into it.
    pub max_rest_bucket: u32,
}

impl SimilarConfig {
    /// Distance at which similarity bottoms out at zero: one tier apart, the
    /// other venue and the full rest penalty.
    pub fn max_distance(&self) -> f64 {
        self.tier_weight + self.venue_weight + self.rest_penalty_cap
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub max_modifications: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub heat_ring_games: Option<usize>,
    pub league_size: Option<u32>,
    pub cache_ttl_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for EngineThresholds {
    fn default() -> Self {
        Self {
            min_sample: 3,
            trend_band: 0.10,
            baseline_band: 0.05,
            recent_window: 5,
            h2h_min_meetings: 3,
            back_to_back_penalty: 0.15,
            pitcher_min_innings: 20.0,
            platoon_min_plate_appearances: 30,
            teammate_min_with: 3,
            teammate_min_without: 2,
            impact_dead_zone: 0.5,
            league_size: 30,
            season_full_sample: 20,
            split_full_sample: 10,
            meetings_full_sample: 6,
            line_history_window: 10,
            hit_rate_over: 0.6,
            hit_rate_under: 0.4,
            neutral_strength: 0.25,
            hitter_friendly_era: 4.75,
            pitcher_friendly_era: 3.25,
            era_strength_span: 1.5,
            loose_whip: 1.4,
            tight_whip: 1.1,
            whip_agreement_bonus: 0.1,
            pitcher_full_innings: 60.0,
            platoon_full_plate_appearances: 120,
            weather: WeatherThresholds::default(),
        }
    }
}

impl Default for WeatherThresholds {
    fn default() -> Self {
        Self {
            wind_floor_mph: 10.0,
            wind_span_mph: 15.0,
            cold_ceiling_f: 55.0,
            cold_span_f: 25.0,
            rain_floor_pct: 30.0,
            rain_span_pct: 50.0,
            severity_threshold: 0.2,
            warm_floor_f: 75.0,
            warm_span_f: 15.0,
            calm_wind_mph: 8.0,
            dry_precip_pct: 20.0,
        }
    }
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            toss_up_margin: 1,
            strong_threshold: 70,
            hit_rate_window: 10,
            min_confidence: 10,
            max_confidence: 99,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { heat_ring_games: 10, moving_average_window: 5, spectrum_points: 60 }
    }
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            streak_length: 3,
            extended_rest_days: 4,
            bounce_back_margin_pct: 0.25,
            inflated_line_pct: 0.20,
        }
    }
}

impl Default for SimilarConfig {
    fn default() -> Self {
        Self {
            min_games: 3,
            min_similarity: 0.85,
            max_games: 15,
            tier_weight: 1.0,
            venue_weight: 1.0,
            rest_weight: 0.5,
            rest_penalty_cap: 1.5,
            max_rest_bucket: 3,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self { max_modifications: 8 }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(thresholds) = patch.thresholds {
            let target = &mut self.engine.thresholds;
            if let Some(min_sample) = thresholds.min_sample {
                target.min_sample = min_sample;
            }
            if let Some(trend_band) = thresholds.trend_band {
                target.trend_band = trend_band;
            }
            if let Some(baseline_band) = thresholds.baseline_band {
                target.baseline_band = baseline_band;
            }
            if let Some(recent_window) = thresholds.recent_window {
                target.recent_window = recent_window;
            }
            if let Some(h2h_min_meetings) = thresholds.h2h_min_meetings {
                target.h2h_min_meetings = h2h_min_meetings;
            }
            if let Some(back_to_back_penalty) = thresholds.back_to_back_penalty {
                target.back_to_back_penalty = back_to_back_penalty;
            }
            if let Some(pitcher_min_innings) = thresholds.pitcher_min_innings {
                target.pitcher_min_innings = pitcher_min_innings;
            }
            if let Some(platoon_min_plate_appearances) = thresholds.platoon_min_plate_appearances {
                target.platoon_min_plate_appearances = platoon_min_plate_appearances;
            }
            if let Some(teammate_min_with) = thresholds.teammate_min_with {
                target.teammate_min_with = teammate_min_with;
            }
            if let Some(teammate_min_without) = thresholds.teammate_min_without {
                target.teammate_min_without = teammate_min_without;
            }
            if let Some(impact_dead_zone) = thresholds.impact_dead_zone {
                target.impact_dead_zone = impact_dead_zone;
            }
            if let Some(league_size) = thresholds.league_size {
                target.league_size = league_size;
            }
            if let Some(season_full_sample) = thresholds.season_full_sample {
                target.season_full_sample = season_full_sample;
            }
            if let Some(split_full_sample) = thresholds.split_full_sample {
                target.split_full_sample = split_full_sample;
            }
            if let Some(meetings_full_sample) = thresholds.meetings_full_sample {
                target.meetings_full_sample = meetings_full_sample;
            }
            if let Some(line_history_window) = thresholds.line_history_window {
                target.line_history_window = line_history_window;
            }
            if let Some(hit_rate_over) = thresholds.hit_rate_over {
                target.hit_rate_over = hit_rate_over;
            }
            if let Some(hit_rate_under) = thresholds.hit_rate_under {
                target.hit_rate_under = hit_rate_under;
            }
            if let Some(neutral_strength) = thresholds.neutral_strength {
                target.neutral_strength = neutral_strength;
            }
            if let Some(hitter_friendly_era) = thresholds.hitter_friendly_era {
                target.hitter_friendly_era = hitter_friendly_era;
            }
            if let Some(pitcher_friendly_era) = thresholds.pitcher_friendly_era {
                target.pitcher_friendly_era = pitcher_friendly_era;
            }
            if let Some(era_strength_span) = thresholds.era_strength_span {
                target.era_strength_span = era_strength_span;
            }
            if let Some(loose_whip) = thresholds.loose_whip {
                target.loose_whip = loose_whip;
            }
            if let Some(tight_whip) = thresholds.tight_whip {
                target.tight_whip = tight_whip;
            }
            if let Some(whip_agreement_bonus) = thresholds.whip_agreement_bonus {
                target.whip_agreement_bonus = whip_agreement_bonus;
            }
            if let Some(pitcher_full_innings) = thresholds.pitcher_full_innings {
                target.pitcher_full_innings = pitcher_full_innings;
            }
            if let Some(platoon_full_plate_appearances) = thresholds.platoon_full_plate_appearances {
                target.platoon_full_plate_appearances = platoon_full_plate_appearances;
            }
            if let Some(weather) = thresholds.weather {
                let target = &mut target.weather;
                if let Some(wind_floor_mph) = weather.wind_floor_mph {
                    target.wind_floor_mph = wind_floor_mph;
                }
                if let Some(wind_span_mph) = weather.wind_span_mph {
                    target.wind_span_mph = wind_span_mph;
                }
                if let Some(cold_ceiling_f) = weather.cold_ceiling_f {
                    target.cold_ceiling_f = cold_ceiling_f;
                }
                if let Some(cold_span_f) = weather.cold_span_f {
                    target.cold_span_f = cold_span_f;
                }
                if let Some(rain_floor_pct) = weather.rain_floor_pct {
                    target.rain_floor_pct = rain_floor_pct;
                }
                if let Some(rain_span_pct) = weather.rain_span_pct {
                    target.rain_span_pct = rain_span_pct;
                }
                if let Some(severity_threshold) = weather.severity_threshold {
                    target.severity_threshold = severity_threshold;
                }
                if let Some(warm_floor_f) = weather.warm_floor_f {
                    target.warm_floor_f = warm_floor_f;
                }
                if let Some(warm_span_f) = weather.warm_span_f {
                    target.warm_span_f = warm_span_f;
                }
                if let Some(calm_wind_mph) = weather.calm_wind_mph {
                    target.calm_wind_mph = calm_wind_mph;
                }
                if let Some(dry_precip_pct) = weather.dry_precip_pct {
                    target.dry_precip_pct = dry_precip_pct;
                }
            }
        }

        if let Some(verdict) = patch.verdict {
            let target = &mut self.engine.verdict;
            if let Some(toss_up_margin) = verdict.toss_up_margin {
                target.toss_up_margin = toss_up_margin;
            }
            if let Some(strong_threshold) = verdict.strong_threshold {
                target.strong_threshold = strong_threshold;
            }
            if let Some(hit_rate_window) = verdict.hit_rate_window {
                target.hit_rate_window = hit_rate_window;
            }
            if let Some(min_confidence) = verdict.min_confidence {
                target.min_confidence = min_confidence;
            }
            if let Some(max_confidence) = verdict.max_confidence {
                target.max_confidence = max_confidence;
            }
        }

        if let Some(windows) = patch.windows {
            let target = &mut self.engine.windows;
            if let Some(heat_ring_games) = windows.heat_ring_games {
                target.heat_ring_games = heat_ring_games;
            }
            if let Some(moving_average_window) = windows.moving_average_window {
                target.moving_average_window = moving_average_window;
            }
            if let Some(spectrum_points) = windows.spectrum_points {
                target.spectrum_points = spectrum_points;
            }
        }

        if let Some(narrative) = patch.narrative {
            let target = &mut self.engine.narrative;
            if let Some(streak_length) = narrative.streak_length {
                target.streak_length = streak_length;
            }
            if let Some(extended_rest_days) = narrative.extended_rest_days {
                target.extended_rest_days = extended_rest_days;
            }
            if let Some(bounce_back_margin_pct) = narrative.bounce_back_margin_pct {
                target.bounce_back_margin_pct = bounce_back_margin_pct;
            }
            if let Some(inflated_line_pct) = narrative.inflated_line_pct {
                target.inflated_line_pct = inflated_line_pct;
            }
        }

        if let Some(similar) = patch.similar {
            let target = &mut self.engine.similar;
            if let Some(min_games) = similar.min_games {
                target.min_games = min_games;
            }
            if let Some(min_similarity) = similar.min_similarity {
                target.min_similarity = min_similarity;
            }
            if let Some(max_games) = similar.max_games {
                target.max_games = max_games;
            }
            if let Some(tier_weight) = similar.tier_weight {
                target.tier_weight = tier_weight;
            }
            if let Some(venue_weight) = similar.venue_weight {
                target.venue_weight = venue_weight;
            }
            if let Some(rest_weight) = similar.rest_weight {
                target.rest_weight = rest_weight;
            }
            if let Some(rest_penalty_cap) = similar.rest_penalty_cap {
                target.rest_penalty_cap = rest_penalty_cap;
            }
            if let Some(max_rest_bucket) = similar.max_rest_bucket {
                target.max_rest_bucket = max_rest_bucket;
            }
        }

        if let Some(simulator) = patch.simulator {
            if let Some(max_modifications) = simulator.max_modifications {
                self.engine.simulator.max_modifications = max_modifications;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(ttl_secs) = cache.ttl_secs {
                self.cache.ttl_secs = ttl_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_MIN_SAMPLE") {
            self.engine.thresholds.min_sample =
                parse_usize("PROPLINE_THRESHOLDS_MIN_SAMPLE", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_TREND_BAND") {
            self.engine.thresholds.trend_band = parse_f64("PROPLINE_THRESHOLDS_TREND_BAND", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_LEAGUE_SIZE") {
            self.engine.thresholds.league_size =
                parse_u32("PROPLINE_THRESHOLDS_LEAGUE_SIZE", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_IMPACT_DEAD_ZONE") {
            self.engine.thresholds.impact_dead_zone =
                parse_f64("PROPLINE_THRESHOLDS_IMPACT_DEAD_ZONE", &value)?;
        }

        if let Some(value) = read_env("PROPLINE_THRESHOLDS_HIT_RATE_OVER") {
            self.engine.thresholds.hit_rate_over =
                parse_f64("PROPLINE_THRESHOLDS_HIT_RATE_OVER", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_HIT_RATE_UNDER") {
            self.engine.thresholds.hit_rate_under =
                parse_f64("PROPLINE_THRESHOLDS_HIT_RATE_UNDER", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_THRESHOLDS_NEUTRAL_STRENGTH") {
            self.engine.thresholds.neutral_strength =
                parse_f64("PROPLINE_THRESHOLDS_NEUTRAL_STRENGTH", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_WEATHER_SEVERITY_THRESHOLD") {
            self.engine.thresholds.weather.severity_threshold =
                parse_f64("PROPLINE_WEATHER_SEVERITY_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("PROPLINE_VERDICT_STRONG_THRESHOLD") {
            self.engine.verdict.strong_threshold =
                parse_u8("PROPLINE_VERDICT_STRONG_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_VERDICT_HIT_RATE_WINDOW") {
            self.engine.verdict.hit_rate_window =
                parse_usize("PROPLINE_VERDICT_HIT_RATE_WINDOW", &value)?;
        }

        if let Some(value) = read_env("PROPLINE_WINDOWS_HEAT_RING_GAMES") {
            self.engine.windows.heat_ring_games =
                parse_usize("PROPLINE_WINDOWS_HEAT_RING_GAMES", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_WINDOWS_MOVING_AVERAGE_WINDOW") {
            self.engine.windows.moving_average_window =
                parse_usize("PROPLINE_WINDOWS_MOVING_AVERAGE_WINDOW", &value)?;
        }

        if let Some(value) = read_env("PROPLINE_SIMILAR_MIN_GAMES") {
            self.engine.similar.min_games = parse_usize("PROPLINE_SIMILAR_MIN_GAMES", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_SIMILAR_MIN_SIMILARITY") {
            self.engine.similar.min_similarity =
                parse_f64("PROPLINE_SIMILAR_MIN_SIMILARITY", &value)?;
        }
        if let Some(value) = read_env("PROPLINE_SIMULATOR_MAX_MODIFICATIONS") {
            self.engine.simulator.max_modifications =
                parse_usize("PROPLINE_SIMULATOR_MAX_MODIFICATIONS", &value)?;
        }

        if let Some(value) = read_env("PROPLINE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_u64("PROPLINE_CACHE_TTL_SECS", &value)?;
        }

        let log_level =
            read_env("PROPLINE_LOGGING_LEVEL").or_else(|| read_env("PROPLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROPLINE_LOGGING_FORMAT").or_else(|| read_env("PROPLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(heat_ring_games) = overrides.heat_ring_games {
            self.engine.windows.heat_ring_games = heat_ring_games;
        }
        if let Some(league_size) = overrides.league_size {
            self.engine.thresholds.league_size = league_size;
        }
        if let Some(ttl_secs) = overrides.cache_ttl_secs {
            self.cache.ttl_secs = ttl_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds(&self.engine.thresholds)?;
        validate_verdict(&self.engine.verdict)?;
        validate_windows(&self.engine.windows)?;
        validate_narrative(&self.engine.narrative)?;
        validate_similar(&self.engine.similar)?;
        validate_simulator(&self.engine.simulator)?;
        validate_cache(&self.cache)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

pub fn detect_config_path() -> Option<PathBuf> {
    resolve_config_path(None)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Validation(format!("{name} must be a positive number")));
    }
    Ok(())
}

fn validate_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(ConfigError::Validation(format!("{name} must be in the open range (0, 1)")));
    }
    Ok(())
}

fn validate_thresholds(thresholds: &EngineThresholds) -> Result<(), ConfigError> {
    if thresholds.min_sample == 0 {
        return Err(ConfigError::Validation(
            "thresholds.min_sample must be greater than zero".to_string(),
        ));
    }
    validate_fraction("thresholds.trend_band", thresholds.trend_band)?;
    validate_fraction("thresholds.baseline_band", thresholds.baseline_band)?;
    if thresholds.recent_window == 0 {
        return Err(ConfigError::Validation(
            "thresholds.recent_window must be greater than zero".to_string(),
        ));
    }
    if thresholds.h2h_min_meetings == 0 {
        return Err(ConfigError::Validation(
            "thresholds.h2h_min_meetings must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&thresholds.back_to_back_penalty) {
        return Err(ConfigError::Validation(
            "thresholds.back_to_back_penalty must be in range 0..=1".to_string(),
        ));
    }
    if !thresholds.pitcher_min_innings.is_finite() || thresholds.pitcher_min_innings < 0.0 {
        return Err(ConfigError::Validation(
            "thresholds.pitcher_min_innings must be a non-negative number".to_string(),
        ));
    }
    if thresholds.teammate_min_with == 0 || thresholds.teammate_min_without == 0 {
        return Err(ConfigError::Validation(
            "thresholds.teammate_min_with and teammate_min_without must be greater than zero"
                .to_string(),
        ));
    }
    if !thresholds.impact_dead_zone.is_finite() || thresholds.impact_dead_zone < 0.0 {
        return Err(ConfigError::Validation(
            "thresholds.impact_dead_zone must be a non-negative number".to_string(),
        ));
    }
    if thresholds.league_size < 3 {
        return Err(ConfigError::Validation(
            "thresholds.league_size must be at least 3".to_string(),
        ));
    }
    if thresholds.season_full_sample == 0
        || thresholds.split_full_sample == 0
        || thresholds.meetings_full_sample == 0
        || thresholds.line_history_window == 0
        || thresholds.platoon_full_plate_appearances == 0
    {
        return Err(ConfigError::Validation(
            "thresholds full-sample sizes and line_history_window must be greater than zero"
                .to_string(),
        ));
    }
    validate_fraction("thresholds.hit_rate_over", thresholds.hit_rate_over)?;
    validate_fraction("thresholds.hit_rate_under", thresholds.hit_rate_under)?;
    if thresholds.hit_rate_under >= thresholds.hit_rate_over {
        return Err(ConfigError::Validation(
            "thresholds.hit_rate_under must be below thresholds.hit_rate_over".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&thresholds.neutral_strength) {
        return Err(ConfigError::Validation(
            "thresholds.neutral_strength must be in range 0..=1".to_string(),
        ));
    }
    validate_positive("thresholds.pitcher_friendly_era", thresholds.pitcher_friendly_era)?;
    validate_positive("thresholds.hitter_friendly_era", thresholds.hitter_friendly_era)?;
    validate_positive("thresholds.loose_whip", thresholds.loose_whip)?;
    validate_positive("thresholds.era_strength_span", thresholds.era_strength_span)?;
    validate_positive("thresholds.tight_whip", thresholds.tight_whip)?;
    validate_positive("thresholds.pitcher_full_innings", thresholds.pitcher_full_innings)?;
    if thresholds.pitcher_friendly_era >= thresholds.hitter_friendly_era {
        return Err(ConfigError::Validation(
            "thresholds.pitcher_friendly_era must be below thresholds.hitter_friendly_era"
                .to_string(),
        ));
    }
    if thresholds.tight_whip >= thresholds.loose_whip {
        return Err(ConfigError::Validation(
            "thresholds.tight_whip must be below thresholds.loose_whip".to_string(),
        ));
    }
    if !(0.0..=0.5).contains(&thresholds.whip_agreement_bonus) {
        return Err(ConfigError::Validation(
            "thresholds.whip_agreement_bonus must be in range 0..=0.5".to_string(),
        ));
    }
    validate_weather(&thresholds.weather)
}

fn validate_weather(weather: &WeatherThresholds) -> Result<(), ConfigError> {
    validate_positive("thresholds.weather.wind_span_mph", weather.wind_span_mph)?;
    validate_positive("thresholds.weather.cold_span_f", weather.cold_span_f)?;
    validate_positive("thresholds.weather.rain_span_pct", weather.rain_span_pct)?;
    validate_positive("thresholds.weather.warm_span_f", weather.warm_span_f)?;
    let readings = [
        ("thresholds.weather.wind_floor_mph", weather.wind_floor_mph),
        ("thresholds.weather.cold_ceiling_f", weather.cold_ceiling_f),
        ("thresholds.weather.rain_floor_pct", weather.rain_floor_pct),
        ("thresholds.weather.warm_floor_f", weather.warm_floor_f),
        ("thresholds.weather.calm_wind_mph", weather.calm_wind_mph),
        ("thresholds.weather.dry_precip_pct", weather.dry_precip_pct),
    ];
    for (name, value) in readings {
        if !value.is_finite() {
            return Err(ConfigError::Validation(format!("{name} must be a finite number")));
        }
    }
    if !(0.0..1.0).contains(&weather.severity_threshold) {
        return Err(ConfigError::Validation(
            "thresholds.weather.severity_threshold must be in range 0..1".to_string(),
        ));
    }
    Ok(())
}

fn validate_verdict(verdict: &VerdictPolicy) -> Result<(), ConfigError> {
    if verdict.min_confidence > verdict.max_confidence || verdict.max_confidence > 100 {
        return Err(ConfigError::Validation(
            "verdict confidence bounds must satisfy min <= max <= 100".to_string(),
        ));
    }
    if verdict.strong_threshold < verdict.min_confidence
        || verdict.strong_threshold > verdict.max_confidence
    {
        return Err(ConfigError::Validation(format!(
            "verdict.strong_threshold must be in range {}..={}",
            verdict.min_confidence, verdict.max_confidence
        )));
    }
    if verdict.hit_rate_window == 0 {
        return Err(ConfigError::Validation(
            "verdict.hit_rate_window must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_windows(windows: &WindowConfig) -> Result<(), ConfigError> {
    if windows.heat_ring_games == 0 || windows.heat_ring_games > 200 {
        return Err(ConfigError::Validation(
            "windows.heat_ring_games must be in range 1..=200".to_string(),
        ));
    }
    if windows.moving_average_window == 0 {
        return Err(ConfigError::Validation(
            "windows.moving_average_window must be greater than zero".to_string(),
        ));
    }
    if windows.spectrum_points < 2 || windows.spectrum_points > 1_000 {
        return Err(ConfigError::Validation(
            "windows.spectrum_points must be in range 2..=1000".to_string(),
        ));
    }
    Ok(())
}

fn validate_narrative(narrative: &NarrativeConfig) -> Result<(), ConfigError> {
    if narrative.streak_length < 2 {
        return Err(ConfigError::Validation(
            "narrative.streak_length must be at least 2".to_string(),
        ));
    }
    validate_fraction("narrative.bounce_back_margin_pct", narrative.bounce_back_margin_pct)?;
    validate_fraction("narrative.inflated_line_pct", narrative.inflated_line_pct)?;
    Ok(())
}

fn validate_similar(similar: &SimilarConfig) -> Result<(), ConfigError> {
    if similar.min_games == 0 {
        return Err(ConfigError::Validation(
            "similar.min_games must be greater than zero".to_string(),
        ));
    }
    if similar.max_games < similar.min_games {
        return Err(ConfigError::Validation(
            "similar.max_games must be at least similar.min_games".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&similar.min_similarity) {
        return Err(ConfigError::Validation(
            "similar.min_similarity must be in range 0..=1".to_string(),
        ));
    }
    let weights = [
        ("similar.tier_weight", similar.tier_weight),
        ("similar.venue_weight", similar.venue_weight),
        ("similar.rest_weight", similar.rest_weight),
        ("similar.rest_penalty_cap", similar.rest_penalty_cap),
    ];
    for (name, value) in weights {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::Validation(format!("{name} must be a non-negative number")));
        }
    }
    if similar.max_distance() <= 0.0 {
        return Err(ConfigError::Validation(
            "similar weights must not all be zero".to_string(),
        ));
    }
    if similar.max_rest_bucket == 0 {
        return Err(ConfigError::Validation(
            "similar.max_rest_bucket must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_simulator(simulator: &SimulatorConfig) -> Result<(), ConfigError> {
    if simulator.max_modifications == 0 {
        return Err(ConfigError::Validation(
            "simulator.max_modifications must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    if cache.ttl_secs == 0 || cache.ttl_secs > 86_400 {
        return Err(ConfigError::Validation(
            "cache.ttl_secs must be in range 1..=86400".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.trim().parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|parsed| parsed.is_finite())
        .ok_or_else(|| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    thresholds: Option<ThresholdsPatch>,
    verdict: Option<VerdictPatch>,
    windows: Option<WindowsPatch>,
    narrative: Option<NarrativePatch>,
    similar: Option<SimilarPatch>,
    simulator: Option<SimulatorPatch>,
    cache: Option<CachePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdsPatch {
    min_sample: Option<usize>,
    trend_band: Option<f64>,
    baseline_band: Option<f64>,
    recent_window: Option<usize>,
    h2h_min_meetings: Option<usize>,
    back_to_back_penalty: Option<f64>,
    pitcher_min_innings: Option<f64>,
    platoon_min_plate_appearances: Option<u32>,
    teammate_min_with: Option<usize>,
    teammate_min_without: Option<usize>,
    impact_dead_zone: Option<f64>,
    league_size: Option<u32>,
    season_full_sample: Option<usize>,
    split_full_sample: Option<usize>,
    meetings_full_sample: Option<usize>,
    line_history_window: Option<usize>,
    hit_rate_over: Option<f64>,
    hit_rate_under: Option<f64>,
    neutral_strength: Option<f64>,
    hitter_friendly_era: Option<f64>,
    pitcher_friendly_era: Option<f64>,
    era_strength_span: Option<f64>,
    loose_whip: Option<f64>,
    tight_whip: Option<f64>,
    whip_agreement_bonus: Option<f64>,
    pitcher_full_innings: Option<f64>,
    platoon_full_plate_appearances: Option<u32>,
    weather: Option<WeatherPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherPatch {
    wind_floor_mph: Option<f64>,
    wind_span_mph: Option<f64>,
    cold_ceiling_f: Option<f64>,
    cold_span_f: Option<f64>,
    rain_floor_pct: Option<f64>,
    rain_span_pct: Option<f64>,
    severity_threshold: Option<f64>,
    warm_floor_f: Option<f64>,
    warm_span_f: Option<f64>,
    calm_wind_mph: Option<f64>,
    dry_precip_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct VerdictPatch {
    toss_up_margin: Option<usize>,
    strong_threshold: Option<u8>,
    hit_rate_window: Option<usize>,
    min_confidence: Option<u8>,
    max_confidence: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct WindowsPatch {
    heat_ring_games: Option<usize>,
    moving_average_window: Option<usize>,
    spectrum_points: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NarrativePatch {
    streak_length: Option<i32>,
    extended_rest_days: Option<u32>,
    bounce_back_margin_pct: Option<f64>,
    inflated_line_pct: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SimilarPatch {
    min_games: Option<usize>,
    min_similarity: Option<f64>,
    max_games: Option<usize>,
    tier_weight: Option<f64>,
    venue_weight: Option<f64>,
    rest_weight: Option<f64>,
    rest_penalty_cap: Option<f64>,
    max_rest_bucket: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulatorPatch {
    max_modifications: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
