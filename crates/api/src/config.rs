use std::path::PathBuf;
use std::str::FromStr;

use axum::http::HeaderValue;
use insight_core::upload::UploadPolicy;

use crate::auth::jwt::JwtConfig;

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Upload handling and processing limits.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Root directory; each job gets `{upload_dir}/{job_id}/`.
    pub upload_dir: PathBuf,
    pub policy: UploadPolicy,
    /// Maximum data rows a processed table may contain.
    pub max_rows: usize,
    /// Upload allowance given to newly registered users.
    pub default_upload_limit: i64,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Deployment name reported by `/` and `/health` (default: `development`).
    pub environment: String,
    /// SQLite connection URL (default: `sqlite://insight.db`).
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks on shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default                                        |
    /// |--------------------------|------------------------------------------------|
    /// | `HOST`                   | `0.0.0.0`                                      |
    /// | `PORT`                   | `8000`                                         |
    /// | `ENVIRONMENT`            | `development`                                  |
    /// | `DATABASE_URL`           | `sqlite://insight.db`                          |
    /// | `CORS_ORIGINS`           | `http://localhost:8501,http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                                           |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | `10`                                           |
    /// | `JWT_SECRET`             | **required**                                   |
    /// | `JWT_EXPIRATION_MINUTES` | `1440`                                         |
    /// | `MAX_FILE_SIZE_MB`       | `10`                                           |
    /// | `MAX_ROWS`               | `10000`                                        |
    /// | `ALLOWED_EXTENSIONS`     | `csv,xlsx,xls`                                 |
    /// | `UPLOAD_DIR`             | `/tmp/uploads`                                 |
    /// | `DEFAULT_UPLOAD_LIMIT`   | `10`                                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let cors_origins = split_list(&env.string("CORS_ORIGINS", "http://localhost:8501,http://localhost:3000"));
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }

        let max_file_size_mb: u64 = env.parse("MAX_FILE_SIZE_MB", 10)?;
        if max_file_size_mb == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_FILE_SIZE_MB",
                value: "0".into(),
                reason: "must be positive".into(),
            });
        }

        let allowed_extensions: Vec<String> = split_list(&env.string("ALLOWED_EXTENSIONS", "csv,xlsx,xls"))
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        if allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                var: "ALLOWED_EXTENSIONS",
                value: String::new(),
                reason: "at least one extension is required".into(),
            });
        }

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8000)?,
            environment: env.string("ENVIRONMENT", "development"),
            database_url: env.string("DATABASE_URL", "sqlite://insight.db"),
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env.parse("SHUTDOWN_TIMEOUT_SECS", 10)?,
            jwt: JwtConfig::from_lookup(&lookup)?,
            upload: UploadConfig {
                upload_dir: PathBuf::from(env.string("UPLOAD_DIR", "/tmp/uploads")),
                policy: UploadPolicy {
                    allowed_extensions,
                    max_file_size_bytes: max_file_size_mb * 1024 * 1024,
                },
                max_rows: env.parse("MAX_ROWS", 10_000)?,
                default_upload_limit: env.parse("DEFAULT_UPLOAD_LIMIT", 10)?,
            },
        })
    }
}

/// Typed access to a variable lookup with defaults.
pub(crate) struct Env<'a, F: Fn(&str) -> Option<String>>(pub(crate) &'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    pub(crate) fn string(&self, var: &str, default: &str) -> String {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    pub(crate) fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(var).map(|v| v.trim().to_string()) {
            None => Ok(default),
            Some(v) if v.is_empty() => Ok(default),
            Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: v,
                reason: e.to_string(),
            }),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.environment, "development");
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:8501", "http://localhost:3000"]
        );
        assert_eq!(config.jwt.expiration_minutes, 1440);
        assert_eq!(config.upload.policy.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.upload.policy.allowed_extensions, vec!["csv", "xlsx", "xls"]);
        assert_eq!(config.upload.max_rows, 10_000);
        assert_eq!(config.upload.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.upload.default_upload_limit, 10);
    }

    #[test]
    fn secret_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET")));
        assert_matches!(load(&[("JWT_SECRET", "  ")]), Err(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = load(&[("JWT_SECRET", "x"), ("PORT", "eighty")]).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { var: "PORT", .. });
        assert!(load(&[("JWT_SECRET", "x"), ("MAX_FILE_SIZE_MB", "0")]).is_err());
    }

    #[test]
    fn extensions_are_normalised() {
        let config = load(&[("JWT_SECRET", "x"), ("ALLOWED_EXTENSIONS", " .CSV, xlsx ,")]).unwrap();
        assert_eq!(config.upload.policy.allowed_extensions, vec!["csv", "xlsx"]);
    }
}
