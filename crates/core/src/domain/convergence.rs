use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Over,
    Under,
    Neutral,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Over => "over",
            Self::Under => "under",
            Self::Neutral => "neutral",
        }
    }

    /// Over when `delta` is positive, under when negative.
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Over
        } else if delta < 0.0 {
            Self::Under
        } else {
            Self::Neutral
        }
    }
}

/// One evaluator's contribution. A strength of zero means the evaluator did
/// not have enough evidence, not that it saw no signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceFactor {
    pub key: String,
    pub name: String,
    pub signal: Signal,
    pub strength: f64,
    pub detail: String,
    #[serde(default)]
    pub data_point: Option<f64>,
}

impl ConvergenceFactor {
    pub fn new(
        key: &str,
        name: &str,
        signal: Signal,
        strength: f64,
        detail: impl Into<String>,
        data_point: Option<f64>,
    ) -> Self {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            key: key.to_string(),
            name: name.to_string(),
            signal,
            strength,
            detail: detail.into(),
            data_point: data_point.filter(|value| value.is_finite()),
        }
    }

    pub fn insufficient(key: &str, name: &str, detail: impl Into<String>) -> Self {
        Self::new(key, name, Signal::Neutral, 0.0, detail, None)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactors {
    pub over_strength: f64,
    pub under_strength: f64,
    pub neutral_strength: f64,
    pub net_strength: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceResult {
    pub factors: Vec<ConvergenceFactor>,
    pub over_count: usize,
    pub under_count: usize,
    pub neutral_count: usize,
    pub roster_size: usize,
    #[serde(default)]
    pub weighted_factors: Option<WeightedFactors>,
}

impl ConvergenceResult {
    pub fn factor(&self, key: &str) -> Option<&ConvergenceFactor> {
        self.factors.iter().find(|factor| factor.key == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Over,
    Under,
    TossUp,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Over => "over",
            Self::Under => "under",
            Self::TossUp => "toss_up",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub direction: Direction,
    /// Net factor agreement in `[-1, 1]`; positive leans over.
    pub convergence_score: f64,
    pub confidence: u8,
    pub hit_rate_l10: f64,
    pub avg_margin_l10: f64,
    pub season_avg: f64,
}

#[cfg(test)]
mod tests {
    use super::{ConvergenceFactor, Direction, Signal};

    #[test]
    fn strength_is_clamped_and_non_finite_is_dropped() {
        let loud = ConvergenceFactor::new("recent_form", "Recent form", Signal::Over, 1.7, "", None);
        let broken =
            ConvergenceFactor::new("venue", "Venue", Signal::Under, f64::NAN, "", Some(f64::INFINITY));

        assert_eq!(loud.strength, 1.0);
        assert_eq!(broken.strength, 0.0);
        assert_eq!(broken.data_point, None);
    }

    #[test]
    fn insufficient_factor_is_silent() {
        let factor = ConvergenceFactor::insufficient("h2h", "Head to head", "2 meetings");
        assert_eq!(factor.signal, Signal::Neutral);
        assert_eq!(factor.strength, 0.0);
    }

    #[test]
    fn signal_follows_delta_sign() {
        assert_eq!(Signal::from_delta(0.4), Signal::Over);
        assert_eq!(Signal::from_delta(-0.1), Signal::Under);
        assert_eq!(Signal::from_delta(0.0), Signal::Neutral);
        assert_eq!(Direction::TossUp.as_str(), "toss_up");
    }
}
