//! Process configuration, read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `JWT_SECRET` | required |
//! | `TOKEN_TTL_SECS` | `600` (at most one year) |
//! | `DATABASE_URL` | unset: in-memory backend |
//! | `DB_MAX_CONNECTIONS` | `10` |
//! | `DB_MIN_CONNECTIONS` | `0` |
//! | `DB_ACQUIRE_TIMEOUT_MS` | `3000` |
//! | `DB_STATEMENT_TIMEOUT_MS` | `5000` |
//! | `DB_IDLE_TIMEOUT_SECS` | `300` |
//! | `DB_MAX_LIFETIME_SECS` | `1800` |
//! | `REQUEST_TIMEOUT_MS` | `10000` |
//! | `HASH_MEMORY_KIB` | `19456` |
//! | `HASH_ITERATIONS` | `2` |
//! | `HASH_PARALLELISM` | `1` |

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use warden_auth::HashingParams;

/// Upper bound on `TOKEN_TTL_SECS`.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Database connection pool settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl fmt::Debug for DbConfig {
    // The URL usually embeds a password.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("max_lifetime", &self.max_lifetime)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// `None` selects the in-memory backend.
    pub database: Option<DbConfig>,
    pub request_timeout: Duration,
    pub hashing: HashingParams,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("database", &self.database)
            .field("request_timeout", &self.request_timeout)
            .field("hashing", &self.hashing)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DbConfig {
                url,
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", 0)?,
                acquire_timeout: Duration::from_millis(parse_or(&get, "DB_ACQUIRE_TIMEOUT_MS", 3_000)?),
                statement_timeout: Duration::from_millis(parse_or(&get, "DB_STATEMENT_TIMEOUT_MS", 5_000)?),
                idle_timeout: Duration::from_secs(parse_or(&get, "DB_IDLE_TIMEOUT_SECS", 300)?),
                max_lifetime: Duration::from_secs(parse_or(&get, "DB_MAX_LIFETIME_SECS", 1_800)?),
            }),
            None => None,
        };

        if let Some(db) = &database {
            if db.max_connections == 0 || db.min_connections > db.max_connections {
                return Err(ConfigError::Invalid {
                    key: "DB_MAX_CONNECTIONS",
                    value: db.max_connections.to_string(),
                });
            }
        }

        let token_ttl_secs: u64 = parse_or(&get, "TOKEN_TTL_SECS", 600)?;
        if token_ttl_secs == 0 || token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid {
                key: "TOKEN_TTL_SECS",
                value: token_ttl_secs.to_string(),
            });
        }

        let defaults = HashingParams::default();
        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            database,
            request_timeout: Duration::from_millis(parse_or(&get, "REQUEST_TIMEOUT_MS", 10_000)?),
            hashing: HashingParams {
                memory_kib: parse_or(&get, "HASH_MEMORY_KIB", defaults.memory_kib)?,
                iterations: parse_or(&get, "HASH_ITERATIONS", defaults.iterations)?,
                parallelism: parse_or(&get, "HASH_PARALLELISM", defaults.parallelism)?,
            },
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
