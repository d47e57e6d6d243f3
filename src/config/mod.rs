use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::services::{StalePolicy, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub profile: ProfileConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub stale_policy: StalePolicy,
    pub max_cas_attempts: u32,
    /// Overrides that did not parse, reported by [`AppConfig::validate`].
    #[serde(skip)]
    pub invalid_overrides: Vec<ConfigError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON array of entity views registered at startup.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Disabled,
    Jwt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub auth_mode: AuthMode,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("PROFILE_STALE_POLICY must be ignore or reject, got '{0}'")]
    InvalidStalePolicy(String),
    #[error("PROFILE_MAX_CAS_ATTEMPTS must be a positive integer, got '{0}'")]
    InvalidMaxCasAttempts(String),
    #[error("SECURITY_JWT_SECRET must be set when SECURITY_AUTH_MODE=jwt")]
    MissingJwtSecret,
    #[error("DATABASE_URL must be set when STORAGE_BACKEND=postgres")]
    MissingDatabaseUrl,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|key| env::var(key).ok())
    }

    /// Reject combinations that cannot start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(err) = self.profile.invalid_overrides.first() {
            return Err(err.clone());
        }
        if self.profile.max_cas_attempts == 0 {
            return Err(ConfigError::InvalidMaxCasAttempts("0".to_string()));
        }
        if self.security.auth_mode == AuthMode::Jwt && self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        Ok(())
    }

    /// Apply overrides from `var` (the process environment in `from_env`).
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        // Profile overrides
        if let Some(v) = var("PROFILE_STALE_POLICY") {
            match v.parse() {
                Ok(policy) => self.profile.stale_policy = policy,
                Err(_) => self.profile.invalid_overrides.push(ConfigError::InvalidStalePolicy(v)),
            }
        }
        if let Some(v) = var("PROFILE_MAX_CAS_ATTEMPTS") {
            match v.trim().parse::<u32>() {
                Ok(attempts) if attempts > 0 => self.profile.max_cas_attempts = attempts,
                _ => self.profile.invalid_overrides.push(ConfigError::InvalidMaxCasAttempts(v)),
            }
        }

        // Storage overrides
        match var("STORAGE_BACKEND").as_deref() {
            Some("postgres") => self.storage.backend = StorageBackend::Postgres,
            Some("memory") => self.storage.backend = StorageBackend::Memory,
            _ => {}
        }
        if let Some(v) = var("CATALOG_SEED_FILE") {
            self.storage.seed_file = Some(PathBuf::from(v));
        }

        // Database overrides
        if let Some(v) = var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(port) = var("CATALOG_API_PORT")
            .or_else(|| var("PORT"))
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.api.port = port;
        }
        if let Some(v) = var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Some(v) = var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        match var("SECURITY_AUTH_MODE").as_deref() {
            Some("jwt") => self.security.auth_mode = AuthMode::Jwt,
            Some("disabled") => self.security.auth_mode = AuthMode::Disabled,
            _ => {}
        }
        if let Some(v) = var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Some(v) = var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            profile: ProfileConfig {
                stale_policy: StalePolicy::Ignore,
                max_cas_attempts: DEFAULT_MAX_ATTEMPTS,
                invalid_overrides: Vec::new(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                seed_file: None,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                auth_mode: AuthMode::Disabled,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            profile: ProfileConfig {
                stale_policy: StalePolicy::Ignore,
                max_cas_attempts: DEFAULT_MAX_ATTEMPTS,
                invalid_overrides: Vec::new(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                seed_file: None,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                auth_mode: AuthMode::Jwt,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            profile: ProfileConfig {
                stale_policy: StalePolicy::Ignore,
                max_cas_attempts: DEFAULT_MAX_ATTEMPTS,
                invalid_overrides: Vec::new(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Postgres,
                seed_file: None,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                auth_mode: AuthMode::Jwt,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                enable_cors: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.security.auth_mode, AuthMode::Disabled);
        assert_eq!(config.profile.stale_policy, StalePolicy::Ignore);
        assert_eq!(config.profile.max_cas_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.security.auth_mode, AuthMode::Jwt);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn test_validate_requires_secrets() {
        let mut config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::MissingJwtSecret)));

        config.security.jwt_secret = "s3cret".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDatabaseUrl)));

        config.database.url = Some("postgres://localhost/catalog".to_string());
        assert!(config.validate().is_ok());
    }

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_profile_overrides_apply() {
        let config = AppConfig::development().with_overrides(overrides(&[
            ("PROFILE_STALE_POLICY", "Reject"),
            ("PROFILE_MAX_CAS_ATTEMPTS", "5"),
            ("STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
        ]));
        assert_eq!(config.profile.stale_policy, StalePolicy::Reject);
        assert_eq!(config.profile.max_cas_attempts, 5);
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_misspelled_stale_policy_fails_validation() {
        let config = AppConfig::development()
            .with_overrides(overrides(&[("PROFILE_STALE_POLICY", "rejct")]));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidStalePolicy("rejct".to_string()))
        );
    }

    #[test]
    fn test_bad_cas_attempts_fail_validation() {
        for raw in ["0", "three", "-1"] {
            let config = AppConfig::development()
                .with_overrides(overrides(&[("PROFILE_MAX_CAS_ATTEMPTS", raw)]));
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidMaxCasAttempts(raw.to_string()))
            );
        }
    }
}
