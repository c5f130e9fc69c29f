//! Configuration validation.
//!
//! Every check runs and every failure is collected, so a misconfigured
//! deployment reports all of its problems at once instead of one per restart.

use crate::AppConfig;
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u64, maximum: u64 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Timeout or interval must be positive.
    NonPositiveDuration { name: String },
    /// Cron expression does not parse.
    InvalidCron { expression: String, message: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// A required setting is missing.
    Missing { name: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {name}: {value} (must be 1-65535)")
            }
            Self::InvalidPoolSize { min, max } => {
                write!(f, "Invalid pool size: min ({min}) cannot be greater than max ({max})")
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {value} exceeds maximum allowed ({maximum})")
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {url_type} URL: {message}")
            }
            Self::NonPositiveDuration { name } => write!(f, "'{name}' must be positive"),
            Self::InvalidCron { expression, message } => {
                write!(f, "Invalid cron expression '{expression}': {message}")
            }
            Self::InvalidLogLevel { value } => write!(
                f,
                "Invalid log level: '{value}' (valid: trace, debug, info, warn, error)"
            ),
            Self::Missing { name } => write!(f, "Missing required setting '{name}'"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u64 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(config, &mut errors);
        Self::validate_database(config, &mut errors);
        Self::validate_redis(config, &mut errors);
        Self::validate_jobs(config, &mut errors);
        Self::validate_workflow(config, &mut errors);
        Self::validate_email(config, &mut errors);
        Self::validate_identity(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.server.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: 0,
            });
        }
        if config.server.request_timeout_secs == 0 {
            errors.push(non_positive("server.request_timeout_secs"));
        }
    }

    fn validate_database(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let db = &config.database;
        if !db.url.starts_with("mysql://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: "URL must start with mysql://".to_string(),
            });
        }
        if db.min_connections > db.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: db.min_connections,
                max: db.max_connections,
            });
        }
        if u64::from(db.max_connections) > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: u64::from(db.max_connections),
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if db.connect_timeout_secs == 0 {
            errors.push(non_positive("database.connect_timeout_secs"));
        }
    }

    fn validate_redis(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let redis = &config.redis;
        if !redis.url.starts_with("redis://") && !redis.url.starts_with("rediss://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        }
        if redis.pool_size as u64 > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: redis.pool_size as u64,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if redis.key_prefix.is_empty() {
            errors.push(missing("redis.key_prefix"));
        }
    }

    fn validate_jobs(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let jobs = &config.jobs;
        if jobs.worker.concurrency == 0 {
            errors.push(non_positive("jobs.worker.concurrency"));
        }
        if jobs.worker.queues.is_empty() {
            errors.push(missing("jobs.worker.queues"));
        }
        if jobs.worker.poll_interval_ms == 0 {
            errors.push(non_positive("jobs.worker.poll_interval_ms"));
        }
        if jobs.scheduler.poll_interval_secs == 0 {
            errors.push(non_positive("jobs.scheduler.poll_interval_secs"));
        }
        if jobs.scheduler.leader_ttl_secs == 0 {
            errors.push(non_positive("jobs.scheduler.leader_ttl_secs"));
        }
    }

    fn validate_workflow(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let workflow = &config.workflow;
        if workflow.payment_window_secs == 0 {
            errors.push(non_positive("workflow.payment_window_secs"));
        }
        if workflow.reminder_lookahead_secs == 0 {
            errors.push(non_positive("workflow.reminder_lookahead_secs"));
        }
        if workflow.seat_write_attempts == 0 {
            errors.push(non_positive("workflow.seat_write_attempts"));
        }
        if let Err(e) = Schedule::from_str(&workflow.reminder_cron) {
            errors.push(ConfigValidationError::InvalidCron {
                expression: workflow.reminder_cron.clone(),
                message: e.to_string(),
            });
        }
    }

    fn validate_email(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.email.smtp_host.is_empty() {
            errors.push(missing("email.smtp_host"));
        }
        if config.email.from_address.is_empty() {
            errors.push(missing("email.from_address"));
        }
    }

    fn validate_identity(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if let Err(e) = Url::parse(&config.identity.api_url) {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "identity.api_url".to_string(),
                message: e.to_string(),
            });
        }
        if config.identity.request_timeout_secs == 0 {
            errors.push(non_positive("identity.request_timeout_secs"));
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let level = config.observability.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.observability.log_level.clone(),
            });
        }
    }
}

fn non_positive(name: &str) -> ConfigValidationError {
    ConfigValidationError::NonPositiveDuration {
        name: name.to_string(),
    }
}

fn missing(name: &str) -> ConfigValidationError {
    ConfigValidationError::Missing {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.database.url = "postgres://nope".to_string();
        config.workflow.payment_window_secs = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_rejects_bad_reminder_cron() {
        let mut config = AppConfig::default();
        config.workflow.reminder_cron = "every eight hours".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert!(matches!(errors[0], ConfigValidationError::InvalidCron { .. }));
    }

    #[test]
    fn test_rejects_inverted_pool_bounds() {
        let mut config = AppConfig::default();
        config.database.min_connections = 30;
        config.database.max_connections = 10;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigValidationError::InvalidPoolSize { min: 30, max: 10 }]
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConfigValidationError::Missing {
            name: "email.smtp_host".to_string(),
        };
        assert!(err.to_string().contains("email.smtp_host"));
    }
}
