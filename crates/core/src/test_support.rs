use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::domain::game_log::GameLogEntry;
use crate::domain::player::{Game, Player, PlayerId, Sport};
use crate::domain::snapshot::{ExtraContext, PropSnapshot};

const OPPONENTS: [&str; 4] = ["LAL", "BOS", "MIA", "PHX"];

pub fn game_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

pub fn entry(stat: &str, value: f64, days_ago: i64) -> GameLogEntry {
    GameLogEntry {
        game_id: None,
        date: game_date() - Duration::days(days_ago),
        opponent: "LAL".to_string(),
        is_home: true,
        rest_days: 1,
        is_back_to_back: false,
        opponent_defense_rank: None,
        stats: BTreeMap::from([(stat.to_string(), value)]),
    }
}

/// Most-recent-first logs, two days apart, alternating home and away.
pub fn logs_with_values(stat: &str, values: &[f64]) -> Vec<GameLogEntry> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let mut game = entry(stat, *value, 2 * (index as i64 + 1));
            game.opponent = OPPONENTS[index % OPPONENTS.len()].to_string();
            game.is_home = index % 2 == 0;
            game
        })
        .collect()
}

pub fn snapshot(stat: &str, line: f64, game_logs: Vec<GameLogEntry>) -> PropSnapshot {
    PropSnapshot {
        player: Player {
            id: PlayerId("p-7".to_string()),
            name: "Test Wing".to_string(),
            team: "DEN".to_string(),
            sport: Sport::Basketball,
            position: Some("F".to_string()),
            former_teams: Vec::new(),
        },
        game: Game {
            id: Some("g-1".to_string()),
            date: game_date(),
            home_team: "DEN".to_string(),
            away_team: "PHX".to_string(),
        },
        game_logs,
        season_stats: None,
        defense_ranking: None,
        injuries: Vec::new(),
        stat: stat.to_string(),
        line,
        rest_days: Some(1),
        is_back_to_back: None,
        extra: ExtraContext::default(),
    }
}
