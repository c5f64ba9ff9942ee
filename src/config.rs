//! Environment-driven application configuration.
//!
//! Values are read once at startup. Parsing goes through a lookup function
//! so tests can supply variables without touching the process environment.

use std::env;
use std::str::FromStr;

use secrecy::SecretString;

use crate::api::RateLimitConfig;
use crate::api::router::REQUEST_TIMEOUT_SECS;
use crate::domain::{ConfigError, DEFAULT_RATE_PER_GB_MONTH, normalize_address};
use crate::infra::SHELBY_RPC_URL;
use crate::infra::observability::LogFormat;

/// Default Aptos fullnode serving the Shelby network.
pub const DEFAULT_NODE_URL: &str = "https://api.shelbynet.shelby.xyz/v1";

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Longest accepted confirmation wait. An upload must still have time for
/// commitments and the data transfer before the request timeout fires.
pub const MAX_CONFIRMATION_TIMEOUT_SECS: u64 = REQUEST_TIMEOUT_SECS - 30;

/// Runtime configuration of the gateway.
#[derive(Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub aptos_node_url: String,
    pub shelby_rpc_url: String,
    pub shelby_module_address: Option<String>,
    pub account_address: Option<String>,
    pub private_key: Option<SecretString>,
    pub api_auth_key: SecretString,
    pub rate_per_gb_month: f64,
    /// `None` when rate limiting is disabled.
    pub rate_limit: Option<RateLimitConfig>,
    pub rpc_max_retries: u32,
    pub confirmation_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_auth_key = get("API_AUTH_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("API_AUTH_KEY".to_string()))?;

        let shelby_module_address = get("SHELBY_MODULE_ADDRESS")
            .map(|v| parse_address("SHELBY_MODULE_ADDRESS", &v))
            .transpose()?;
        let account_address = get("APTOS_ACCOUNT_ADDRESS")
            .map(|v| parse_address("APTOS_ACCOUNT_ADDRESS", &v))
            .transpose()?;
        let private_key = get("APTOS_PRIVATE_KEY").map(SecretString::from);

        if private_key.is_some() && account_address.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "APTOS_ACCOUNT_ADDRESS".to_string(),
            ));
        }

        let rate_per_gb_month =
            parse_or(&get, "STORAGE_RATE_PER_GB_MONTH", DEFAULT_RATE_PER_GB_MONTH)?;
        if !rate_per_gb_month.is_finite() || rate_per_gb_month < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "STORAGE_RATE_PER_GB_MONTH".to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }

        let rate_limit = if parse_or(&get, "ENABLE_RATE_LIMITING", false)? {
            let defaults = RateLimitConfig::default();
            let config = RateLimitConfig {
                general_rps: parse_or(&get, "RATE_LIMIT_RPS", defaults.general_rps)?,
                general_burst: parse_or(&get, "RATE_LIMIT_BURST", defaults.general_burst)?,
                ..defaults
            };
            if config.general_rps == 0 || config.general_burst == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "RATE_LIMIT_RPS".to_string(),
                    message: "rate and burst must be positive".to_string(),
                });
            }
            Some(config)
        } else {
            None
        };

        let confirmation_timeout_secs = parse_or(&get, "CONFIRMATION_TIMEOUT_SECS", 60)?;
        if confirmation_timeout_secs > MAX_CONFIRMATION_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                key: "CONFIRMATION_TIMEOUT_SECS".to_string(),
                message: format!("must be at most {MAX_CONFIRMATION_TIMEOUT_SECS}"),
            });
        }

        let log_format = match get("LOG_FORMAT") {
            Some(v) => parse_log_format(&v)?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            aptos_node_url: get("APTOS_NODE_URL").unwrap_or_else(|| DEFAULT_NODE_URL.to_string()),
            shelby_rpc_url: get("SHELBY_RPC_URL").unwrap_or_else(|| SHELBY_RPC_URL.to_string()),
            shelby_module_address,
            account_address,
            private_key,
            api_auth_key,
            rate_per_gb_month,
            rate_limit,
            rpc_max_retries: parse_or(&get, "RPC_MAX_RETRIES", 3)?,
            confirmation_timeout_secs,
            log_format,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_address(key: &str, value: &str) -> Result<String, ConfigError> {
    normalize_address(value).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_log_format(value: &str) -> Result<LogFormat, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "json" => Ok(LogFormat::Json),
        "pretty" | "text" => Ok(LogFormat::Pretty),
        other => Err(ConfigError::InvalidValue {
            key: "LOG_FORMAT".to_string(),
            message: format!("expected 'json' or 'pretty', got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("API_AUTH_KEY", "secret")]).unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.aptos_node_url, DEFAULT_NODE_URL);
        assert_eq!(config.shelby_rpc_url, SHELBY_RPC_URL);
        assert_eq!(config.api_auth_key.expose_secret(), "secret");
        assert_eq!(config.rate_per_gb_month, 0.05);
        assert!(config.rate_limit.is_none());
        assert!(config.private_key.is_none());
        assert_eq!(config.rpc_max_retries, 3);
        assert_eq!(config.confirmation_timeout_secs, 60);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_missing_api_key() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "API_AUTH_KEY"));

        let err = load(&[("API_AUTH_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_signer_settings() {
        let config = load(&[
            ("API_AUTH_KEY", "k"),
            ("APTOS_PRIVATE_KEY", "0x01"),
            ("APTOS_ACCOUNT_ADDRESS", "0xCAFE"),
            ("SHELBY_MODULE_ADDRESS", "0x5BE1"),
        ])
        .unwrap();

        assert_eq!(config.account_address.as_deref(), Some("0xcafe"));
        assert_eq!(config.shelby_module_address.as_deref(), Some("0x5be1"));
        assert!(config.private_key.is_some());
    }

    #[test]
    fn test_private_key_requires_account_address() {
        let err = load(&[("API_AUTH_KEY", "k"), ("APTOS_PRIVATE_KEY", "0x01")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "APTOS_ACCOUNT_ADDRESS"));
    }

    #[test]
    fn test_invalid_address() {
        let err = load(&[("API_AUTH_KEY", "k"), ("SHELBY_MODULE_ADDRESS", "shelby")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_rate_limiting() {
        let config = load(&[
            ("API_AUTH_KEY", "k"),
            ("ENABLE_RATE_LIMITING", "true"),
            ("RATE_LIMIT_RPS", "5"),
        ])
        .unwrap();

        let rate_limit = config.rate_limit.unwrap();
        assert_eq!(rate_limit.general_rps, 5);
        assert_eq!(rate_limit.general_burst, 20);

        let err = load(&[
            ("API_AUTH_KEY", "k"),
            ("ENABLE_RATE_LIMITING", "true"),
            ("RATE_LIMIT_RPS", "0"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = load(&[("API_AUTH_KEY", "k"), ("RPC_MAX_RETRIES", "many")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "RPC_MAX_RETRIES"
        ));

        let err = load(&[("API_AUTH_KEY", "k"), ("STORAGE_RATE_PER_GB_MONTH", "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_confirmation_timeout_fits_request_timeout() {
        let config = load(&[("API_AUTH_KEY", "k"), ("CONFIRMATION_TIMEOUT_SECS", "90")]).unwrap();
        assert_eq!(config.confirmation_timeout_secs, 90);
        assert!(config.confirmation_timeout_secs < REQUEST_TIMEOUT_SECS);

        for value in ["91", "120", "600"] {
            let err = load(&[("API_AUTH_KEY", "k"), ("CONFIRMATION_TIMEOUT_SECS", value)])
                .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "CONFIRMATION_TIMEOUT_SECS"
            ));
        }
    }

    #[test]
    fn test_log_format() {
        let config = load(&[("API_AUTH_KEY", "k"), ("LOG_FORMAT", "JSON")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        assert!(load(&[("API_AUTH_KEY", "k"), ("LOG_FORMAT", "xml")]).is_err());
    }
}
