//! Deployment environment, which picks the `{environment}.toml` layer

use std::fmt;
use std::str::FromStr;

use crate::config::error::ConfigError;

/// Deployment environment of the scheduler process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub const ENV_VAR: &'static str = "FUSION_APP_ENV";

    /// Read `FUSION_APP_ENV`, falling back to `Development` when it is unset.
    /// An unknown value is logged as a warning and also falls back.
    pub fn from_env() -> Self {
        let Ok(value) = std::env::var(Self::ENV_VAR) else {
            return Self::default();
        };
        value.parse().unwrap_or_else(|e: ConfigError| {
            tracing::warn!(error = %e, "Ignoring {}", Self::ENV_VAR);
            Self::default()
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    /// File name of this environment's layer in the config directory.
    pub fn layer_file(&self) -> String {
        format!("{}.toml", self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
