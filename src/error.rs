use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::guarantee::actions::ActionError;
use crate::workflows::guarantee::policy::PolicyLoadError;
use crate::workflows::guarantee::repository::RepositoryError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Policy(PolicyLoadError),
    Repository(RepositoryError),
    Workflow(ActionError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Policy(err) => write!(f, "policy error: {}", err),
            AppError::Repository(err) => write!(f, "repository error: {}", err),
            AppError::Workflow(err) => write!(f, "workflow error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Policy(err) => Some(err),
            AppError::Repository(err) => Some(err),
            AppError::Workflow(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<PolicyLoadError> for AppError {
    fn from(value: PolicyLoadError) -> Self {
        Self::Policy(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<ActionError> for AppError {
    fn from(value: ActionError) -> Self {
        Self::Workflow(value)
    }
}
