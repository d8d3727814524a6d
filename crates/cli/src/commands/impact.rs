use std::path::Path;

use chrono::NaiveDate;
use propline_core::config::AppConfig;
use propline_core::errors::{ApplicationError, EngineError};
use propline_core::whatif::{
    teammate_absence_impact, TeammateImpact, TeammateLog, WhatIfModification,
};
use serde::{Deserialize, Serialize};

use crate::commands::{read_json, CommandResult};

/// Input document for `propline impact`.
#[derive(Debug, Deserialize)]
pub struct ImpactInput {
    pub stat: String,
    /// Dates the absent player appeared.
    pub player_game_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub teammates: Vec<TeammateLog>,
}

#[derive(Debug, Serialize)]
pub struct ImpactEntry {
    #[serde(flatten)]
    pub impact: TeammateImpact,
    pub suggested_modification: Option<WhatIfModification>,
}

#[derive(Debug, Serialize)]
pub struct ImpactOutput {
    pub stat: String,
    pub evaluated_teammates: usize,
    pub impacts: Vec<ImpactEntry>,
}

pub fn run(config: &AppConfig, input_path: &Path, pretty: bool) -> CommandResult {
    match impact_file(config, input_path) {
        Ok(output) => CommandResult::success("impact", &output, pretty),
        Err(error) => CommandResult::from_application_error("impact", error),
    }
}

pub fn compute_impacts(config: &AppConfig, input: &ImpactInput) -> Result<ImpactOutput, EngineError> {
    if input.stat.trim().is_empty() {
        return Err(EngineError::InvalidInput("stat name is required".to_string()));
    }

    let impacts = teammate_absence_impact(
        &input.player_game_dates,
        &input.teammates,
        &input.stat,
        &config.engine.thresholds,
    )
    .into_iter()
    .map(|impact| {
        let suggested_modification = impact.as_modification();
        ImpactEntry { impact, suggested_modification }
    })
    .collect();

    Ok(ImpactOutput {
        stat: input.stat.clone(),
        evaluated_teammates: input.teammates.len(),
        impacts,
    })
}

fn impact_file(config: &AppConfig, input_path: &Path) -> Result<ImpactOutput, ApplicationError> {
    let input: ImpactInput = read_json(input_path)?;
    Ok(compute_impacts(config, &input)?)
}
