//! Runtime configuration read from the environment.

use actix_cors::Cors;
use actix_web::http::Uri;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:4200";
pub const DEFAULT_CORS_MAX_AGE: usize = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Cross-origin policy for browser clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    /// Preflight cache lifetime, in seconds.
    pub max_age: usize,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            max_age: DEFAULT_CORS_MAX_AGE,
        }
    }
}

impl CorsConfig {
    /// Builds the actix middleware for this policy.
    pub fn middleware(&self) -> Cors {
        self.allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allow_any_header()
            .supports_credentials()
            .max_age(self.max_age)
    }
}

/// Reads from environment variables:
/// - `DATABASE_URL`: Postgres connection string (required)
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `8080`)
/// - `CORS_ALLOWED_ORIGINS`: comma separated origins (default: `http://localhost:4200`)
/// - `CORS_MAX_AGE`: preflight cache seconds (default: `3600`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;

        let allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(parse_origin)
                .collect::<Result<_, _>>()?,
            None => vec![DEFAULT_CORS_ORIGIN.to_string()],
        };
        let max_age = parse_or("CORS_MAX_AGE", lookup("CORS_MAX_AGE"), DEFAULT_CORS_MAX_AGE)?;

        Ok(Self {
            database_url,
            host,
            port,
            cors: CorsConfig {
                allowed_origins,
                max_age,
            },
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Credentials are allowed, so the wildcard origin is refused along with
/// anything that is not `scheme://host[:port]`.
fn parse_origin(origin: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "CORS_ALLOWED_ORIGINS",
        value: origin.to_string(),
    };

    let uri: Uri = origin.parse().map_err(|_| invalid())?;
    let bare = uri.path_and_query().map_or(true, |pq| pq.as_str() == "/");
    if uri.scheme().is_none() || uri.host().is_none() || !bare || origin.ends_with('/') {
        return Err(invalid());
    }
    Ok(origin.to_string())
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
