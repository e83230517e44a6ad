use crate::workflows::courrier::DeadlinePolicy;
use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub deadlines: DeadlinePolicy,
    pub reporting: ReportingConfig,
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

        let defaults = DeadlinePolicy::default();
        let deadlines = DeadlinePolicy {
            urgente_days: deadline_days("APP_DEADLINE_URGENTE_DAYS", defaults.urgente_days)?,
            haute_days: deadline_days("APP_DEADLINE_HAUTE_DAYS", defaults.haute_days)?,
            normale_days: deadline_days("APP_DEADLINE_NORMALE_DAYS", defaults.normale_days)?,
            basse_days: deadline_days("APP_DEADLINE_BASSE_DAYS", defaults.basse_days)?,
        };

        let utc_offset = match env::var("APP_REPORTING_UTC_OFFSET") {
            Ok(raw) => parse_utc_offset(&raw).ok_or(ConfigError::InvalidUtcOffset(raw))?,
            Err(_) => utc(),
        };

        let poll_secs = env::var("APP_DASHBOARD_POLL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidPollInterval)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            deadlines,
            reporting: ReportingConfig {
                utc_offset,
                poll_interval: Duration::from_secs(poll_secs),
            },
        })
    }
}

fn deadline_days(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidDeadline { var }),
        Err(_) => Ok(default),
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parses `+HH:MM`, `-HH:MM`, `+HHMM` or `Z` into a fixed UTC offset.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Some(utc());
    }

    let (sign, rest) = match trimmed.chars().next()? {
        '+' => (1, &trimmed[1..]),
        '-' => (-1, &trimmed[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Dashboard refresh cadence and the timezone used for "today".
#[derive(Debug, Clone)]
pub struct ReportingConfig {
    pub utc_offset: FixedOffset,
    pub poll_interval: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDeadline { var: &'static str },
    InvalidUtcOffset(String),
    InvalidPollInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDeadline { var } => {
                write!(f, "{var} must be a non-negative number of days")
            }
            ConfigError::InvalidUtcOffset(raw) => {
                write!(f, "APP_REPORTING_UTC_OFFSET '{raw}' must look like +01:00")
            }
            ConfigError::InvalidPollInterval => {
                write!(f, "APP_DASHBOARD_POLL_SECS must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDeadline { .. }
            | ConfigError::InvalidUtcOffset(_)
            | ConfigError::InvalidPollInterval => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DEADLINE_URGENTE_DAYS",
            "APP_DEADLINE_HAUTE_DAYS",
            "APP_DEADLINE_NORMALE_DAYS",
            "APP_DEADLINE_BASSE_DAYS",
            "APP_REPORTING_UTC_OFFSET",
            "APP_DASHBOARD_POLL_SECS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.deadlines, DeadlinePolicy::default());
        assert_eq!(config.reporting.utc_offset.local_minus_utc(), 0);
        assert_eq!(config.reporting.poll_interval, Duration::from_secs(300));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn deadline_and_reporting_overrides_are_applied() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DEADLINE_URGENTE_DAYS", "1");
        env::set_var("APP_DEADLINE_BASSE_DAYS", "30");
        env::set_var("APP_REPORTING_UTC_OFFSET", "+01:00");
        env::set_var("APP_DASHBOARD_POLL_SECS", "60");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.deadlines.urgente_days, 1);
        assert_eq!(config.deadlines.haute_days, 5);
        assert_eq!(config.deadlines.basse_days, 30);
        assert_eq!(config.reporting.utc_offset.local_minus_utc(), 3600);
        assert_eq!(config.reporting.poll_interval, Duration::from_secs(60));
        reset_env();
    }

    #[test]
    fn rejects_malformed_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DEADLINE_HAUTE_DAYS", "soon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidDeadline {
                var: "APP_DEADLINE_HAUTE_DAYS"
            })
        ));

        reset_env();
        env::set_var("APP_REPORTING_UTC_OFFSET", "Europe/Paris");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidUtcOffset(_))
        ));

        reset_env();
        env::set_var("APP_DASHBOARD_POLL_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPollInterval)
        ));
        reset_env();
    }

    #[test]
    fn parses_offset_variants() {
        assert_eq!(
            parse_utc_offset("-05:30").map(|o| o.local_minus_utc()),
            Some(-(5 * 3600 + 30 * 60))
        );
        assert_eq!(
            parse_utc_offset("+0100").map(|o| o.local_minus_utc()),
            Some(3600)
        );
        assert_eq!(parse_utc_offset("Z").map(|o| o.local_minus_utc()), Some(0));
        assert!(parse_utc_offset("+25:00").is_none());
        assert!(parse_utc_offset("01:00").is_none());
    }
}
