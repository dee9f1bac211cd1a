//! Host environment passed to HTTP pipeline contributions.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Development environment (local)
    Development,
    /// Staging environment (pre-production)
    Staging,
    /// Production environment
    Production,
}

impl Environment {
    /// Check if this is production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "staging" | "stage" => Ok(Self::Staging),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidValue {
                key: "Platform:Environment".to_string(),
                reason: format!("unknown environment '{s}'"),
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "Development"),
            Self::Staging => write!(f, "Staging"),
            Self::Production => write!(f, "Production"),
        }
    }
}

/// What an HTTP contribution knows about the process it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Deployment environment
    pub environment: Environment,
    /// Application name, used in logs and metric labels
    pub application_name: String,
}

impl HostEnvironment {
    /// Create a host environment.
    #[must_use]
    pub fn new(environment: Environment, application_name: impl Into<String>) -> Self {
        Self {
            environment,
            application_name: application_name.into(),
        }
    }
}
