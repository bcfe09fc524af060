//! Service configuration from the environment.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Service configuration, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Absent means polls live in memory only.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Number of reverse proxies in front of the service that append to
    /// `X-Forwarded-For`. Zero ignores the header and uses the peer address.
    pub trusted_proxy_hops: usize,
    /// `None` allows any origin.
    pub cors_allow_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3030,
            database_url: None,
            max_connections: 5,
            trusted_proxy_hops: 0,
            cors_allow_origin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(v) => v.parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                expected: "a valid number",
                value: v,
            })?,
            None => defaults.port,
        };
        let max_connections = match non_empty("DATABASE_MAX_CONNECTIONS") {
            Some(v) => match v.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DATABASE_MAX_CONNECTIONS",
                        expected: "a positive number",
                        value: v,
                    })
                }
            },
            None => defaults.max_connections,
        };
        let trusted_proxy_hops = match non_empty("TRUSTED_PROXY_HOPS") {
            Some(v) => v.trim().parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "TRUSTED_PROXY_HOPS",
                expected: "a non-negative number",
                value: v,
            })?,
            None => defaults.trusted_proxy_hops,
        };

        Ok(Config {
            port,
            database_url: non_empty("DATABASE_URL"),
            max_connections,
            trusted_proxy_hops,
            cors_allow_origin: non_empty("CORS_ALLOW_ORIGIN").filter(|v| v != "*"),
        })
    }
}
