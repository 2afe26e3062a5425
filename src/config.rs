use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_PORT: u16 = 4211;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    /// Deadline for a whole inbound request, including the upstream fetch.
    pub request_timeout: Duration,
    /// Optional cap on the outbound fetch alone.
    pub fetch_timeout: Option<Duration>,
    pub shutdown_grace: Duration,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            request_timeout: Duration::from_secs(600),
            fetch_timeout: None,
            shutdown_grace: Duration::from_secs(5),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();
        Self::from_lookup(|key| match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    /// Builds a config from an arbitrary key lookup, falling back to the
    /// defaults for every key that is absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        let defaults = Config::default();

        let host = lookup("HOST")?.unwrap_or_else(|| defaults.server_addr.ip().to_string());
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        let port = parse_or(&lookup, "PORT", defaults.server_addr.port())?;

        let request_timeout = Duration::from_secs(parse_or(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?);
        let fetch_timeout = match lookup("FETCH_TIMEOUT_SECS")? {
            Some(raw) => Some(Duration::from_secs(parse_value("FETCH_TIMEOUT_SECS", &raw)?)),
            None => None,
        };
        let shutdown_grace = Duration::from_secs(parse_or(
            &lookup,
            "SHUTDOWN_GRACE_SECS",
            defaults.shutdown_grace.as_secs(),
        )?);
        let max_body_bytes = parse_or(&lookup, "MAX_BODY_BYTES", defaults.max_body_bytes)?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            request_timeout,
            fetch_timeout,
            shutdown_grace,
            max_body_bytes,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<Option<String>>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key)? {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| Ok(map.get(key).cloned())
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.server_addr.port(), 4211);
        assert_eq!(config.request_timeout, Duration::from_secs(600));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert!(config.fetch_timeout.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("FETCH_TIMEOUT_SECS", "30"),
            ("SHUTDOWN_GRACE_SECS", "1"),
        ]))
        .unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.shutdown_grace, Duration::from_secs(1));
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(msg) if msg.contains("PORT")));
    }

    #[test]
    fn invalid_host_is_a_config_error() {
        let err = Config::from_lookup(lookup_from(&[("HOST", "not an ip")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
