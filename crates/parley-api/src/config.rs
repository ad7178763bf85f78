//! Server configuration read from the environment.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use parley_core::directory::CallPolicy;

use crate::error::AppError;

const DEFAULT_IDENTITY_SERVICE_URL: &str = "http://customer-management-service:8084";

/// Runtime settings of the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// PEM-encoded RSA public key used to verify bearer tokens.
    pub jwt_public_key_path: PathBuf,
    /// Base URL of the customer service that resolves display names.
    pub identity_service_url: String,
    pub presence_ttl: Duration,
    pub typing_ttl: Duration,
    pub event_log_partitions: usize,
    /// Applied to identity and membership lookups.
    pub collaborator_policy: CallPolicy,
    /// Applied to event-log publishes.
    pub publish_policy: CallPolicy,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = required(&lookup, "DATABASE_URL")?;
        let jwt_public_key_path = PathBuf::from(required(&lookup, "JWT_PUBLIC_KEY_PATH")?);

        let collaborator_timeout =
            Duration::from_millis(parsed(&lookup, "COLLABORATOR_TIMEOUT_MS", 2000)?);
        let defaults = CallPolicy::default();
        let collaborator_policy = CallPolicy {
            timeout: collaborator_timeout,
            attempts: parsed(&lookup, "COLLABORATOR_ATTEMPTS", defaults.attempts)?,
            backoff: defaults.backoff,
        };
        let publish_policy = CallPolicy {
            timeout: collaborator_timeout,
            attempts: parsed(&lookup, "PUBLISH_ATTEMPTS", defaults.attempts)?,
            backoff: defaults.backoff,
        };

        Ok(Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parsed(&lookup, "PORT", 3000)?,
            jwt_public_key_path,
            identity_service_url: lookup("IDENTITY_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_IDENTITY_SERVICE_URL.to_owned()),
            presence_ttl: Duration::from_secs(parsed(&lookup, "PRESENCE_TTL_SECS", 300)?),
            typing_ttl: Duration::from_secs(parsed(&lookup, "TYPING_TTL_SECS", 2)?),
            event_log_partitions: parsed(&lookup, "EVENT_LOG_PARTITIONS", 8)?,
            collaborator_policy,
            publish_policy,
        })
    }

    /// Socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid host.
    pub fn bind_address(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, AppError> {
    lookup(key).ok_or_else(|| AppError::Config(format!("{key} environment variable must be set")))
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/parley"),
        ("JWT_PUBLIC_KEY_PATH", "/etc/parley/jwt.pub.pem"),
    ];

    #[test]
    fn test_defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup_from(&REQUIRED)).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.identity_service_url, DEFAULT_IDENTITY_SERVICE_URL);
        assert_eq!(config.presence_ttl, Duration::from_secs(300));
        assert_eq!(config.typing_ttl, Duration::from_secs(2));
        assert_eq!(config.event_log_partitions, 8);
        assert_eq!(config.collaborator_policy.timeout, Duration::from_secs(2));
        assert_eq!(config.collaborator_policy.attempts, 3);
        assert_eq!(config.publish_policy.attempts, 3);
    }

    #[test]
    fn test_overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("TYPING_TTL_SECS", "5"),
            ("COLLABORATOR_TIMEOUT_MS", "250"),
            ("PUBLISH_ATTEMPTS", "5"),
        ]);

        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.typing_ttl, Duration::from_secs(5));
        assert_eq!(config.publish_policy.timeout, Duration::from_millis(250));
        assert_eq!(config.publish_policy.attempts, 5);
        assert_eq!(config.bind_address().unwrap().port(), 8080);
    }

    #[test]
    fn test_missing_database_url_is_a_config_error() {
        let result = Config::from_lookup(lookup_from(&[("JWT_PUBLIC_KEY_PATH", "/k.pem")]));

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("DATABASE_URL")));
    }

    #[test]
    fn test_unparseable_port_is_a_config_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));

        let result = Config::from_lookup(lookup_from(&pairs));

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }
}
