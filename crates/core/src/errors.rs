use thiserror::Error;

use crate::config::ConfigError;
use crate::whatif::SimulatorGuardrailError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Simulator(#[from] SimulatorGuardrailError),
    #[error("engine invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("could not read input `{path}`: {message}")]
    InputRead { path: String, message: String },
    #[error("could not decode input `{path}`: {message}")]
    InputDecode { path: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "bad_request",
            Self::Internal { .. } => "internal",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Engine(EngineError::InvalidInput(message)) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Engine(EngineError::Simulator(error)) => {
                Self::BadRequest { message: error.user_safe_message(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::InputRead { .. } | ApplicationError::InputDecode { .. } => {
                Self::BadRequest { message: value.to_string(), correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Engine(EngineError::InvariantViolation(message)) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(error) => {
                Self::Internal { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, EngineError, InterfaceError};
    use crate::whatif::SimulatorGuardrailError;

    #[test]
    fn invalid_input_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::from(EngineError::InvalidInput("stat name is required".to_owned()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn guardrail_rejection_carries_user_safe_message() {
        let interface = ApplicationError::from(EngineError::from(
            SimulatorGuardrailError::TooManyModifications { requested: 12, max_allowed: 8 },
        ))
        .into_interface("req-2");

        match interface {
            InterfaceError::BadRequest { message, .. } => {
                assert_eq!(message, "You can simulate up to 8 changes at once.");
            }
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn decode_failure_is_a_bad_request() {
        let interface = ApplicationError::InputDecode {
            path: "snapshot.json".to_owned(),
            message: "missing field `stat`".to_owned(),
        }
        .into_interface("req-3");

        assert_eq!(interface.error_class(), "bad_request");
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::from(ConfigError::Validation("bad threshold".to_owned()))
                .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
