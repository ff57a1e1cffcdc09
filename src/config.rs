use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Only the backfill worker opens MySQL
    pub database_url: Option<String>,
    pub redis_url: String,
    pub alchemy_api_key: Option<String>,
    pub bind_addr: SocketAddr,
    pub day_delay: Duration,
    pub max_attempts: u32,
    pub http_timeout: Duration,
}

impl Config {
    const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:3000";
    const DEFAULT_DAY_DELAY_MS: u64 = 500;
    const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    /// Build the config from environment variables (call `dotenv` first)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let redis_url = required("REDIS_URL")?;
        let alchemy_api_key = lookup("ALCHEMY_API_KEY").filter(|v| !v.trim().is_empty());

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let day_delay_ms = parse_or(&lookup, "BACKFILL_DAY_DELAY_MS", Self::DEFAULT_DAY_DELAY_MS)?;
        let max_attempts = parse_or(&lookup, "BACKFILL_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;
        let timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", Self::DEFAULT_HTTP_TIMEOUT_SECS)?;

        Ok(Self {
            database_url,
            redis_url,
            alchemy_api_key,
            bind_addr,
            day_delay: Duration::from_millis(day_delay_ms),
            max_attempts,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_applied() {
        let vars = env(&[("DATABASE_URL", "mysql://localhost/prices"), ("REDIS_URL", "redis://localhost")]);
        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.day_delay, Duration::from_millis(500));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.alchemy_api_key.is_none());
    }

    #[test]
    fn test_database_url_only_required_on_demand() {
        let vars = env(&[("REDIS_URL", "redis://localhost")]);
        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert!(config.database_url.is_none());
        assert!(matches!(config.require_database_url(), Err(ConfigError::Missing("DATABASE_URL"))));

        let vars = env(&[("DATABASE_URL", "mysql://localhost/prices"), ("REDIS_URL", "redis://localhost")]);
        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.require_database_url().unwrap(), "mysql://localhost/prices");
    }

    #[test]
    fn test_missing_redis_url() {
        let vars = env(&[("DATABASE_URL", "mysql://localhost/prices")]);
        let err = Config::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("REDIS_URL")));
    }

    #[test]
    fn test_invalid_delay_rejected() {
        let vars = env(&[
            ("DATABASE_URL", "mysql://localhost/prices"),
            ("REDIS_URL", "redis://localhost"),
            ("BACKFILL_DAY_DELAY_MS", "soon"),
        ]);
        let err = Config::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BACKFILL_DAY_DELAY_MS", .. }));
    }

    #[test]
    fn test_blank_api_key_is_absent() {
        let vars = env(&[
            ("DATABASE_URL", "mysql://localhost/prices"),
            ("REDIS_URL", "redis://localhost"),
            ("ALCHEMY_API_KEY", "  "),
        ]);
        let config = Config::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert!(config.alchemy_api_key.is_none());
    }
}
