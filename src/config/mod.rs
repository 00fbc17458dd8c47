use std::env;
use std::fmt;
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Self::Development),
            "test" | "ci" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidEnvironment(value.to_string())),
        }
    }
}

/// Top-level configuration for the engine and its CLI.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        )?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        if log_level.trim().is_empty() {
            return Err(ConfigError::EmptyLogLevel);
        }

        let policy_path = match env::var("APP_POLICY_PATH") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => {
                let path = PathBuf::from(raw.trim());
                if !path.is_file() {
                    return Err(ConfigError::MissingPolicyFile(path));
                }
                Some(path)
            }
            Err(_) => None,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            workflow: WorkflowConfig { policy_path },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the access policy comes from; the built-in tree is used when no file is set.
#[derive(Debug, Clone, Default)]
pub struct WorkflowConfig {
    pub policy_path: Option<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    EmptyLogLevel,
    MissingPolicyFile(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be development, test or production (got '{value}')"
            ),
            ConfigError::EmptyLogLevel => write!(f, "APP_LOG_LEVEL must not be empty"),
            ConfigError::MissingPolicyFile(path) => {
                write!(f, "APP_POLICY_PATH '{}' is not a readable file", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}
