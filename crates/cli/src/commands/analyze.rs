use std::path::Path;

use propline_core::config::AppConfig;
use propline_core::domain::snapshot::PropSnapshot;
use propline_core::errors::ApplicationError;
use propline_core::report::{analyze_prop, PropReport};

use crate::commands::{read_json, CommandResult};

pub fn run(config: &AppConfig, snapshot_path: &Path, pretty: bool) -> CommandResult {
    match analyze_file(config, snapshot_path) {
        Ok(report) => CommandResult::success("analyze", &report, pretty),
        Err(error) => CommandResult::from_application_error("analyze", error),
    }
}

fn analyze_file(config: &AppConfig, snapshot_path: &Path) -> Result<PropReport, ApplicationError> {
    let snapshot: PropSnapshot = read_json(snapshot_path)?;
    Ok(analyze_prop(&snapshot, &config.engine)?)
}
