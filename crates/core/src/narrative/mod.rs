use serde::{Deserialize, Serialize};

use crate::analytics::heat_ring::current_streak;
use crate::config::{EngineConfig, NarrativeConfig};
use crate::domain::convergence::Signal;
use crate::domain::game_log::{mean, stat_samples, GameLogEntry};
use crate::domain::player::{same_team, InjuryReport};
use crate::domain::snapshot::PropSnapshot;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrativeFlag {
    pub key: String,
    pub title: String,
    pub detail: String,
    #[serde(default)]
    pub lean: Option<Signal>,
}

impl NarrativeFlag {
    fn new(key: &str, title: &str, detail: String, lean: Option<Signal>) -> Self {
        Self { key: key.to_string(), title: title.to_string(), detail, lean }
    }
}

/// Everything the narrative rules look at, borrowed from one snapshot.
#[derive(Clone, Debug)]
pub struct NarrativeContext<'a> {
    pub game_logs: &'a [GameLogEntry],
    pub stat: &'a str,
    pub line: f64,
    pub season_avg: f64,
    pub player_name: &'a str,
    pub team: &'a str,
    pub opponent: &'a str,
    pub former_teams: &'a [String],
    pub is_home: bool,
    /// `None` when rest is unknown; the rest rules then stay silent.
    pub rest_days: Option<u32>,
    pub is_back_to_back: bool,
    pub injuries: &'a [InjuryReport],
}

impl<'a> NarrativeContext<'a> {
    pub fn from_snapshot(snapshot: &'a PropSnapshot) -> Self {
        Self {
            game_logs: &snapshot.game_logs,
            stat: &snapshot.stat,
            line: snapshot.line,
            season_avg: snapshot.season().average,
            player_name: &snapshot.player.name,
            team: &snapshot.player.team,
            opponent: snapshot.opponent(),
            former_teams: &snapshot.player.former_teams,
            is_home: snapshot.is_home(),
            rest_days: snapshot.rest_days(),
            is_back_to_back: snapshot.is_back_to_back(),
            injuries: &snapshot.injuries,
        }
    }
}

/// Independent heuristic rules. Each rule adds at most one flag and no rule
/// reads another's output.
#[derive(Clone, Debug)]
pub struct NarrativeDetector {
    config: NarrativeConfig,
    trend_band: f64,
    min_split_games: usize,
}

impl Default for NarrativeDetector {
    fn default() -> Self {
        Self::from_engine_config(&EngineConfig::default())
    }
}

impl NarrativeDetector {
    pub fn new(config: NarrativeConfig, trend_band: f64, min_split_games: usize) -> Self {
        Self { config, trend_band, min_split_games }
    }

    pub fn from_engine_config(config: &EngineConfig) -> Self {
        Self::new(
            config.narrative.clone(),
            config.thresholds.trend_band,
            config.thresholds.min_sample,
        )
    }

    pub fn config(&self) -> &NarrativeConfig {
        &self.config
    }

    pub fn detect(&self, context: &NarrativeContext<'_>) -> Vec<NarrativeFlag> {
        let mut flags = Vec::new();
        flags.extend(self.rest_flags(context));
        flags.extend(self.venue_flag(context));
        flags.extend(self.streak_flag(context));
        flags.extend(revenge_flag(context));
        flags.extend(injury_flags(context));
        flags.extend(self.bounce_back_flag(context));
        flags.extend(self.inflated_line_flag(context));
        flags
    }

    fn rest_flags(&self, context: &NarrativeContext<'_>) -> Vec<NarrativeFlag> {
        let mut flags = Vec::new();
        if context.is_back_to_back || context.rest_days == Some(0) {
            flags.push(NarrativeFlag::new(
                "back_to_back",
                "Back-to-Back",
                "Second game on consecutive days; legs tend to fade late.".to_string(),
                Some(Signal::Under),
            ));
            return flags;
        }

        let Some(rest_days) = context.rest_days else {
            return flags;
        };
        if rest_days <= 1 {
            flags.push(NarrativeFlag::new(
                "short_rest",
                "Short Rest",
                format!("Only {rest_days} day of rest before this game."),
                Some(Signal::Under),
            ));
        }
        if rest_days >= self.config.extended_rest_days {
            flags.push(NarrativeFlag::new(
                "extended_rest",
                "Extended Rest",
                format!("{rest_days} days off; fresh legs but possible rust."),
                None,
            ));
        }
        flags
    }

    fn venue_flag(&self, context: &NarrativeContext<'_>) -> Option<NarrativeFlag> {
        let samples = stat_samples(context.game_logs, context.stat);
        let home: Vec<f64> =
            samples.iter().filter(|sample| sample.entry.is_home).map(|sample| sample.value).collect();
        let away: Vec<f64> =
            samples.iter().filter(|sample| !sample.entry.is_home).map(|sample| sample.value).collect();
        if home.len() < self.min_split_games || away.len() < self.min_split_games {
            return None;
        }

        let home_avg = mean(home)?;
        let away_avg = mean(away)?;
        if context.is_home && home_avg >= away_avg * (1.0 + self.trend_band) && home_avg > away_avg
        {
            return Some(NarrativeFlag::new(
                "home_cooking",
                "Home Cooking",
                format!("Averages {home_avg:.1} at home vs {away_avg:.1} on the road."),
                Some(Signal::Over),
            ));
        }
        if !context.is_home && away_avg <= home_avg * (1.0 - self.trend_band) && away_avg < home_avg
        {
            return Some(NarrativeFlag::new(
                "road_woes",
                "Road Woes",
                format!("Averages {away_avg:.1} on the road vs {home_avg:.1} at home."),
                Some(Signal::Under),
            ));
        }
        None
    }

    fn streak_flag(&self, context: &NarrativeContext<'_>) -> Option<NarrativeFlag> {
        let streak = current_streak(
            stat_samples(context.game_logs, context.stat)
                .iter()
                .map(|sample| sample.value > context.line),
        );

        if streak >= self.config.streak_length {
            return Some(NarrativeFlag::new(
                "hot_streak",
                "Hot Streak",
                format!("Cleared {} in {streak} straight games.", context.line),
                Some(Signal::Over),
            ));
        }
        if streak <= -self.config.streak_length {
            return Some(NarrativeFlag::new(
                "cold_streak",
                "Cold Streak",
                format!("Fell short of {} in {} straight games.", context.line, -streak),
                Some(Signal::Under),
            ));
        }
        None
    }

    fn bounce_back_flag(&self, context: &NarrativeContext<'_>) -> Option<NarrativeFlag> {
        let last = stat_samples(context.game_logs, context.stat).into_iter().next()?;
        let shortfall = context.line - last.value;
        if context.line <= 0.0 || shortfall <= self.config.bounce_back_margin_pct * context.line {
            return None;
        }
        Some(NarrativeFlag::new(
            "bounce_back",
            "Bounce-Back Spot",
            format!(
                "Posted {:.1} last game vs {} on {}, missing the line by {shortfall:.1}.",
                last.value, last.entry.opponent, context.line
            ),
            Some(Signal::Over),
        ))
    }

    fn inflated_line_flag(&self, context: &NarrativeContext<'_>) -> Option<NarrativeFlag> {
        if context.season_avg <= 0.0
            || context.line <= context.season_avg * (1.0 + self.config.inflated_line_pct)
        {
            return None;
        }
        Some(NarrativeFlag::new(
            "inflated_line",
            "Inflated Line",
            format!(
                "Line of {} sits {:.0}% above the {:.1} season average.",
                context.line,
                (context.line / context.season_avg - 1.0) * 100.0,
                context.season_avg
            ),
            Some(Signal::Under),
        ))
    }
}

fn revenge_flag(context: &NarrativeContext<'_>) -> Option<NarrativeFlag> {
    let former = context.former_teams.iter().find(|team| same_team(team, context.opponent))?;
    Some(NarrativeFlag::new(
        "revenge_game",
        "Revenge Game",
        format!("Facing former team {former}."),
        Some(Signal::Over),
    ))
}

fn injury_flags(context: &NarrativeContext<'_>) -> Vec<NarrativeFlag> {
    let absent = |team: &str| -> Vec<String> {
        context
            .injuries
            .iter()
            .filter(|report| report.status.is_likely_absent())
            .filter(|report| same_team(&report.team, team))
            .filter(|report| !report.player_name.eq_ignore_ascii_case(context.player_name))
            .map(|report| format!("{} ({})", report.player_name, report.status.as_str()))
            .collect()
    };

    let mut flags = Vec::new();
    let teammates = absent(context.team);
    if !teammates.is_empty() {
        flags.push(NarrativeFlag::new(
            "teammate_out",
            "Teammate Out",
            format!("{} unlikely to play; more usage available.", teammates.join(", ")),
            Some(Signal::Over),
        ));
    }

    let opponents = absent(context.opponent);
    if !opponents.is_empty() {
        flags.push(NarrativeFlag::new(
            "opponent_depleted",
            "Opponent Depleted",
            format!("{} unlikely to play for {}.", opponents.join(", "), context.opponent),
            Some(Signal::Over),
        ));
    }
    flags
}

#[cfg(test)]
mod tests {
    use crate::domain::convergence::Signal;
    use crate::domain::player::{InjuryReport, InjuryStatus};
    use crate::test_support::{logs_with_values, snapshot};

    use super::{NarrativeContext, NarrativeDetector, NarrativeFlag};

    fn keys(flags: &[NarrativeFlag]) -> Vec<&str> {
        flags.iter().map(|flag| flag.key.as_str()).collect()
    }

    #[test]
    fn quiet_spot_raises_no_flags() {
        let mut snapshot = snapshot("points", 22.5, logs_with_values("points", &[24.0, 20.0, 23.0]));
        snapshot.rest_days = Some(2);

        let flags = NarrativeDetector::default().detect(&NarrativeContext::from_snapshot(&snapshot));
        assert!(flags.is_empty(), "unexpected flags: {:?}", keys(&flags));
    }

    #[test]
    fn rest_rules_are_mutually_consistent() {
        let detector = NarrativeDetector::default();
        let mut snapshot = snapshot("points", 22.5, Vec::new());

        snapshot.is_back_to_back = Some(true);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&snapshot));
        assert_eq!(keys(&flags), vec!["back_to_back"]);

        snapshot.is_back_to_back = None;
        snapshot.rest_days = Some(1);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&snapshot));
        assert_eq!(keys(&flags), vec!["short_rest"]);

        snapshot.rest_days = Some(4);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&snapshot));
        assert_eq!(keys(&flags), vec!["extended_rest"]);
    }

    #[test]
    fn unknown_rest_raises_no_rest_flags() {
        let mut snapshot = snapshot("points", 22.5, Vec::new());
        snapshot.rest_days = None;
        snapshot.is_back_to_back = None;

        let context = NarrativeContext::from_snapshot(&snapshot);
        assert_eq!(context.rest_days, None);
        assert!(NarrativeDetector::default().detect(&context).is_empty());
    }

    #[test]
    fn zero_rest_without_flag_reads_as_back_to_back() {
        let mut snapshot = snapshot("points", 22.5, Vec::new());
        snapshot.rest_days = Some(0);
        snapshot.is_back_to_back = None;

        let flags = NarrativeDetector::default().detect(&NarrativeContext::from_snapshot(&snapshot));
        assert_eq!(keys(&flags), vec!["back_to_back"]);
        assert!(flags.iter().all(|flag| !flag.detail.contains("Only 0 day")));
    }

    #[test]
    fn streaks_and_bounce_back() {
        let detector = NarrativeDetector::default();
        let mut hot = snapshot("points", 20.5, logs_with_values("points", &[25.0, 24.0, 23.0, 10.0]));
        hot.rest_days = Some(2);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&hot));
        assert!(keys(&flags).contains(&"hot_streak"));

        let mut cold = snapshot("points", 20.5, logs_with_values("points", &[12.0, 18.0, 19.0, 30.0]));
        cold.rest_days = Some(2);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&cold));
        let found = keys(&flags);
        assert!(found.contains(&"cold_streak"));
        assert!(found.contains(&"bounce_back"));
        let bounce = flags.iter().find(|flag| flag.key == "bounce_back").expect("bounce flag");
        assert_eq!(bounce.lean, Some(Signal::Over));
    }

    #[test]
    fn venue_split_flags_need_both_sides() {
        let detector = NarrativeDetector::default();
        let logs = logs_with_values("points", &[30.0, 20.0, 30.0, 20.0, 30.0, 20.0]);

        let mut home = snapshot("points", 25.5, logs.clone());
        home.rest_days = Some(2);
        let flags = detector.detect(&NarrativeContext::from_snapshot(&home));
        assert!(keys(&flags).contains(&"home_cooking"));

        let mut away = snapshot("points", 25.5, logs);
        away.rest_days = Some(2);
        away.game.home_team = "PHX".to_string();
        away.game.away_team = "DEN".to_string();
        let flags = detector.detect(&NarrativeContext::from_snapshot(&away));
        assert!(keys(&flags).contains(&"road_woes"));
    }

    #[test]
    fn roster_context_flags() {
        let mut snapshot = snapshot("points", 31.0, logs_with_values("points", &[24.0, 25.0, 26.0]));
        snapshot.rest_days = Some(2);
        snapshot.player.former_teams = vec!["phx".to_string()];
        snapshot.injuries = vec![
            InjuryReport {
                player_name: "Second Option".to_string(),
                team: "DEN".to_string(),
                status: InjuryStatus::Out,
                detail: None,
            },
            InjuryReport {
                player_name: "Bench Guard".to_string(),
                team: "DEN".to_string(),
                status: InjuryStatus::Questionable,
                detail: None,
            },
            InjuryReport {
                player_name: "Rim Protector".to_string(),
                team: "PHX".to_string(),
                status: InjuryStatus::Doubtful,
                detail: Some("ankle".to_string()),
            },
        ];

        let flags = NarrativeDetector::default().detect(&NarrativeContext::from_snapshot(&snapshot));
        let found = keys(&flags);
        assert!(found.contains(&"revenge_game"));
        assert!(found.contains(&"teammate_out"));
        assert!(found.contains(&"opponent_depleted"));
        assert!(found.contains(&"inflated_line"));

        let teammate = flags.iter().find(|flag| flag.key == "teammate_out").expect("teammate flag");
        assert!(teammate.detail.starts_with("Second Option (out)"));
        assert!(!teammate.detail.contains("Bench Guard"));

        let opponent =
            flags.iter().find(|flag| flag.key == "opponent_depleted").expect("opponent flag");
        assert!(opponent.detail.contains("Rim Protector (doubtful)"));
    }
}
