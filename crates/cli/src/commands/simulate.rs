use std::path::Path;

use propline_core::config::AppConfig;
use propline_core::domain::snapshot::PropSnapshot;
use propline_core::errors::{ApplicationError, EngineError};
use propline_core::whatif::{WhatIfModification, WhatIfResult, WhatIfSimulator};

use crate::commands::{read_json, CommandResult};

pub fn run(
    config: &AppConfig,
    snapshot_path: &Path,
    modifications_path: &Path,
    pretty: bool,
) -> CommandResult {
    match simulate_files(config, snapshot_path, modifications_path) {
        Ok(result) => CommandResult::success("simulate", &result, pretty),
        Err(error) => CommandResult::from_application_error("simulate", error),
    }
}

fn simulate_files(
    config: &AppConfig,
    snapshot_path: &Path,
    modifications_path: &Path,
) -> Result<WhatIfResult, ApplicationError> {
    let snapshot: PropSnapshot = read_json(snapshot_path)?;
    let modifications: Vec<WhatIfModification> = read_json(modifications_path)?;
    snapshot.validate()?;

    let simulator = WhatIfSimulator::with_config(config.engine.clone());
    simulator.simulate(&snapshot, modifications).map_err(|error| EngineError::from(error).into())
}
