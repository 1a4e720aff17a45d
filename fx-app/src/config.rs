//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use fx_hex::ServiceConfig;

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Plaintext bearer key; only its SHA-256 digest is handed to the server
    pub api_key: String,
    pub service: ServiceConfig,
    pub provider_requests_per_minute: u32,
    pub provider_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = parse_or("PORT", env::var("PORT").ok(), 3000)?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let api_key = env::var("API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("API_KEY environment variable is required"))?;

        let defaults = ServiceConfig::default();
        let service = ServiceConfig {
            max_resolve_attempts: parse_or(
                "RESOLVE_MAX_ATTEMPTS",
                env::var("RESOLVE_MAX_ATTEMPTS").ok(),
                defaults.max_resolve_attempts,
            )?,
            refresh_on_read: parse_or(
                "REFRESH_ON_READ",
                env::var("REFRESH_ON_READ").ok(),
                defaults.refresh_on_read,
            )?,
            lookback_days: parse_or(
                "REFRESH_LOOKBACK_DAYS",
                env::var("REFRESH_LOOKBACK_DAYS").ok(),
                defaults.lookback_days,
            )?,
        };
        if service.max_resolve_attempts == 0 {
            anyhow::bail!("RESOLVE_MAX_ATTEMPTS must be at least 1");
        }

        let provider_requests_per_minute = parse_or(
            "PROVIDER_REQUESTS_PER_MINUTE",
            env::var("PROVIDER_REQUESTS_PER_MINUTE").ok(),
            60,
        )?;
        let provider_timeout = Duration::from_secs(parse_or(
            "PROVIDER_TIMEOUT_SECS",
            env::var("PROVIDER_TIMEOUT_SECS").ok(),
            10,
        )?);

        Ok(Self {
            port,
            database_url,
            api_key,
            service,
            provider_requests_per_minute,
            provider_timeout,
        })
    }
}

/// Parses an optional raw value, falling back to `default` when unset.
fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} {:?}: {}", name, raw, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_uses_default() {
        assert_eq!(parse_or::<u16>("PORT", None, 3000).unwrap(), 3000);
    }

    #[test]
    fn test_value_is_trimmed_and_parsed() {
        assert_eq!(parse_or::<u64>("REFRESH_LOOKBACK_DAYS", Some(" 30 ".into()), 365).unwrap(), 30);
        assert!(!parse_or("REFRESH_ON_READ", Some("false".into()), true).unwrap());
    }

    #[test]
    fn test_garbage_names_the_variable() {
        let err = parse_or::<u32>("RESOLVE_MAX_ATTEMPTS", Some("many".into()), 3).unwrap_err();
        assert!(err.to_string().contains("RESOLVE_MAX_ATTEMPTS"));
    }
}
