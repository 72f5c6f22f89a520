//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use pokerdesk::db::DatabaseConfig;
use std::net::SocketAddr;

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 6969);

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Keep all data in process memory instead of PostgreSQL
    pub in_memory: bool,
    /// Security configuration
    pub security: SecurityConfig,
    /// Initial password of accounts created for walk-in players
    pub manual_registration_password: String,
    /// Prometheus scrape listener, disabled when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Staff account created at startup
    pub staff: Option<StaffAccountConfig>,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Access token lifetime
    pub access_token_minutes: i64,
}

/// Bootstrap staff account
#[derive(Debug, Clone)]
pub struct StaffAccountConfig {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Values given on the command line, which win over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub in_memory: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F, overrides: CliOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Bind address
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND", lookup("SERVER_BIND"))?
                .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND)),
        };

        // Database configuration
        let database_url = overrides
            .database_url
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| DatabaseConfig::development().database_url);

        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_or(&lookup, "DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: parse_or(
                &lookup,
                "DB_CONNECTION_TIMEOUT_SECS",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: parse_or(&lookup, "DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        };

        // Security configuration (REQUIRED)
        let jwt_secret = lookup("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper =
            lookup("PASSWORD_PEPPER").ok_or_else(|| ConfigError::MissingRequired {
                var: "PASSWORD_PEPPER".to_string(),
                hint: "Generate with: openssl rand -hex 16".to_string(),
            })?;

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            access_token_minutes: parse_or(&lookup, "ACCESS_TOKEN_MINUTES", 12 * 60),
        };

        let manual_registration_password = lookup("MANUAL_REGISTRATION_PASSWORD")
            .unwrap_or_else(|| "ChangeMe123".to_string());

        let metrics_bind = parse_addr("METRICS_BIND", lookup("METRICS_BIND"))?;

        let staff = match (lookup("STAFF_EMAIL"), lookup("STAFF_PASSWORD")) {
            (Some(email), Some(password)) => Some(StaffAccountConfig {
                email,
                name: lookup("STAFF_NAME").unwrap_or_else(|| "Tournament Staff".to_string()),
                password,
            }),
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    var: "STAFF_PASSWORD".to_string(),
                    hint: "Set it together with STAFF_EMAIL".to_string(),
                });
            }
            _ => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            in_memory: overrides.in_memory,
            security,
            manual_registration_password,
            metrics_bind,
            staff,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        if self.security.access_token_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.manual_registration_password.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "MANUAL_REGISTRATION_PASSWORD".to_string(),
                reason: "Must not be blank".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_addr(var: &str, value: Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .map(|v| {
            v.parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{}' is not an IP:PORT address", v),
            })
        })
        .transpose()
}
