//! Environment-driven configuration for the console client.

use std::time::Duration;

use crate::dispatch::RetryPolicy;
use crate::error::ConfigError;

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8002/xiaozhi";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Base URL every API path is appended to.
    pub service_url: String,
    /// Path prefix the console is served under.
    pub public_path: String,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            public_path: "/".to_string(),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(url) = lookup("MANAGER_SERVICE_URL") {
            config.service_url = url;
        }
        if let Some(path) = lookup("MANAGER_PUBLIC_PATH") {
            config.public_path = path;
        }
        if let Some(n) = parse(&lookup, "MANAGER_RETRY_MAX_ATTEMPTS")? {
            config.retry.max_attempts = n;
        }
        if let Some(ms) = parse(&lookup, "MANAGER_RETRY_INITIAL_BACKOFF_MS")? {
            config.retry.initial_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&lookup, "MANAGER_RETRY_MAX_BACKOFF_MS")? {
            config.retry.max_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = parse(&lookup, "MANAGER_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ConsoleConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn overrides_are_applied() {
        let config = ConsoleConfig::from_lookup(lookup(&[
            ("MANAGER_SERVICE_URL", "http://api:8002/xiaozhi"),
            ("MANAGER_PUBLIC_PATH", "/console/"),
            ("MANAGER_RETRY_MAX_ATTEMPTS", "5"),
            ("MANAGER_RETRY_INITIAL_BACKOFF_MS", " 50 "),
            ("MANAGER_REQUEST_TIMEOUT_MS", "1000"),
        ]))
        .unwrap();
        assert_eq!(config.service_url, "http://api:8002/xiaozhi");
        assert_eq!(config.public_path, "/console/");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(1));
    }

    #[test]
    fn invalid_number_is_rejected() {
        let err = ConsoleConfig::from_lookup(lookup(&[("MANAGER_RETRY_MAX_ATTEMPTS", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "MANAGER_RETRY_MAX_ATTEMPTS".to_string(),
                value: "lots".to_string(),
            }
        );
    }
}
