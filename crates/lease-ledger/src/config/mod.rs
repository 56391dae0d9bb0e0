use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::ledger::leases::{LeaseConfig, TerminationPropertyRule};
use crate::ledger::scoring::{LandlordWeights, ScoringWeights, TenantWeights, WeightsError};
use crate::reconciliation::SchedulerConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
    pub weights: ScoringWeights,
    pub leases: LeaseConfig,
    /// JSON snapshot loaded into the in-memory store at startup.
    pub seed_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let score_interval_secs = env::var("APP_SCORE_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidInterval)?;
        let daily_run_hour = env::var("APP_DAILY_RUN_HOUR")
            .unwrap_or_else(|_| "0".to_string())
            .parse::<u32>()
            .ok()
            .filter(|hour| *hour < 24)
            .ok_or(ConfigError::InvalidRunHour)?;

        let defaults = ScoringWeights::default();
        let weights = ScoringWeights {
            landlord: LandlordWeights {
                rating: weight("APP_WEIGHT_RATING", defaults.landlord.rating)?,
                maintenance: weight("APP_WEIGHT_MAINTENANCE", defaults.landlord.maintenance)?,
                behavior: weight("APP_WEIGHT_BEHAVIOR", defaults.landlord.behavior)?,
            },
            tenant: TenantWeights {
                payment: weight("APP_WEIGHT_PAYMENT", defaults.tenant.payment)?,
                feedback: weight("APP_WEIGHT_FEEDBACK", defaults.tenant.feedback)?,
            },
        }
        .validate()
        .map_err(ConfigError::Weights)?;

        let release = flag("APP_RELEASE_PROPERTY_ON_TERMINATION")?;
        let seed_path = env::var("APP_SEED_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scheduler: SchedulerConfig {
                score_interval: Duration::from_secs(score_interval_secs),
                daily_run_hour,
            },
            weights,
            leases: LeaseConfig {
                termination_property_rule: TerminationPropertyRule::from_release_flag(release),
            },
            seed_path,
        })
    }
}

fn weight(var: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidWeight { var }),
        Err(_) => Ok(default),
    }
}

fn flag(var: &'static str) -> Result<bool, ConfigError> {
    let Ok(raw) = env::var(var) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag { var }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidInterval,
    InvalidRunHour,
    InvalidWeight { var: &'static str },
    InvalidFlag { var: &'static str },
    Weights(WeightsError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidInterval => {
                write!(f, "APP_SCORE_INTERVAL_SECS must be a positive number of seconds")
            }
            ConfigError::InvalidRunHour => write!(f, "APP_DAILY_RUN_HOUR must be between 0 and 23"),
            ConfigError::InvalidWeight { var } => write!(f, "{var} must be a decimal number"),
            ConfigError::InvalidFlag { var } => write!(f, "{var} must be true or false"),
            ConfigError::Weights(err) => write!(f, "invalid scoring weights: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Weights(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidInterval
            | ConfigError::InvalidRunHour
            | ConfigError::InvalidWeight { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
