pub mod analyze;
pub mod batch;
pub mod config;
pub mod impact;
pub mod simulate;

use std::fs;
use std::path::Path;

use chrono::Utc;
use propline_core::errors::{ApplicationError, InterfaceError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandPayload<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    result: &'a T,
}

impl CommandResult {
    pub fn success<T: Serialize>(command: &str, result: &T, pretty: bool) -> Self {
        let payload = CommandPayload { command, status: "ok", result };
        let serialized = if pretty {
            serde_json::to_string_pretty(&payload)
        } else {
            serde_json::to_string(&payload)
        };

        match serialized {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(
                command,
                "serialization",
                format!("could not serialize result: {error}"),
                1,
            ),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_outcome(payload) }
    }

    /// Input and configuration problems exit with 2, everything else with 1.
    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        if let ApplicationError::Configuration(error) = &error {
            return Self::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }

        let correlation_id = format!("{command}-{}", Utc::now().timestamp_millis());
        let interface = error.into_interface(correlation_id.clone());
        let (message, exit_code) = match &interface {
            InterfaceError::BadRequest { message, .. } => (message.clone(), 2),
            InterfaceError::Internal { .. } => (interface.user_message().to_string(), 1),
        };

        warn!(
            event_name = "cli.command.failed",
            command,
            correlation_id = %correlation_id,
            error_class = interface.error_class(),
            error = %interface,
            "command failed"
        );
        Self::failure(command, interface.error_class(), message, exit_code)
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| ApplicationError::InputRead {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;

    serde_json::from_str(&raw).map_err(|error| ApplicationError::InputDecode {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

fn serialize_outcome(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
