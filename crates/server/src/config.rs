//! Server configuration
//!
//! Values come from an optional TOML file and are then overridden by
//! `STAYBOOK_*` environment variables.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::Deserialize;
use staybook_core::PricingPolicy;

/// File read when `STAYBOOK_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "staybook.toml";

/// Secret used when none is configured; only fit for local development
const DEVELOPMENT_SECRET: &str = "staybook-development-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Could not determine data directory")]
    NoDataDir,
}

/// Account created on first start when no administrator exists
#[derive(Debug, Clone, Deserialize)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Socket address the HTTP server listens on
    pub bind: String,
    /// SQLite file; defaults to the platform data directory
    pub database: Option<PathBuf>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log: String,
    pub tax_rate: Decimal,
    pub weekend_premium: Decimal,
    pub admin: Option<SeedAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        let policy = PricingPolicy::default();
        Self {
            bind: "0.0.0.0:8080".to_string(),
            database: None,
            jwt_secret: DEVELOPMENT_SECRET.to_string(),
            token_ttl_hours: 24,
            log: "info".to_string(),
            tax_rate: policy.tax_rate,
            weekend_premium: policy.weekend_premium,
            admin: None,
        }
    }
}

impl Config {
    /// Load from `STAYBOOK_CONFIG` (or `staybook.toml` when present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os("STAYBOOK_CONFIG").map(PathBuf::from);
        let path = explicit.or_else(|| {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `STAYBOOK_*` variables looked up through `var`
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(bind) = var("STAYBOOK_BIND") {
            self.bind = bind;
        }
        if let Some(database) = var("STAYBOOK_DATABASE") {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(secret) = var("STAYBOOK_JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(log) = var("STAYBOOK_LOG") {
            self.log = log;
        }
        if let Some(rate) = var("STAYBOOK_TAX_RATE") {
            self.tax_rate = rate.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "STAYBOOK_TAX_RATE",
                value: rate.clone(),
            })?;
        }
        let seed = (var("STAYBOOK_ADMIN_EMAIL"), var("STAYBOOK_ADMIN_PASSWORD"));
        if let (Some(email), Some(password)) = seed {
            self.admin = Some(SeedAdmin { email, password });
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate.is_sign_negative() || self.tax_rate > Decimal::ONE {
            return Err(ConfigError::Invalid {
                key: "tax_rate",
                value: self.tax_rate.to_string(),
            });
        }
        if self.weekend_premium.is_sign_negative() {
            return Err(ConfigError::Invalid {
                key: "weekend_premium",
                value: self.weekend_premium.to_string(),
            });
        }
        if self.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                key: "token_ttl_hours",
                value: self.token_ttl_hours.to_string(),
            });
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid {
                key: "jwt_secret",
                value: String::new(),
            });
        }
        Ok(())
    }

    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_SECRET
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate: self.tax_rate,
            weekend_premium: self.weekend_premium,
        }
    }

    /// Configured database file, or `staybook.db` in the platform data directory
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let dirs = ProjectDirs::from("dev", "staybook", "staybook").ok_or(ConfigError::NoDataDir)?;
        Ok(dirs.data_dir().join("staybook.db"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_file_then_env() {
        let mut config = Config::from_toml(
            r#"
            bind = "127.0.0.1:9000"
            tax_rate = "0.10"
            log = "debug"

            [admin]
            email = "root@staybook.test"
            password = "change-me-now"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.tax_rate, dec!(0.10));
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.admin.as_ref().unwrap().email, "root@staybook.test");

        let env: HashMap<&str, &str> =
            [("STAYBOOK_BIND", "0.0.0.0:7000"), ("STAYBOOK_TAX_RATE", "0.2")].into();
        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind, "0.0.0.0:7000");
        assert_eq!(config.pricing_policy().tax_rate, dec!(0.2));
        assert_eq!(config.log, "debug");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = Config::default();
        let err = config.apply_env(|key| (key == "STAYBOOK_TAX_RATE").then(|| "lots".to_string()));
        assert!(matches!(err, Err(ConfigError::Invalid { key: "STAYBOOK_TAX_RATE", .. })));

        let mut config = Config::default();
        config.tax_rate = dec!(1.5);
        assert!(config.apply_env(|_| None).is_err());

        assert!(Config::from_toml("bind = [").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staybook.toml");
        let text = "token_ttl_hours = 2\njwt_secret = \"a-much-longer-secret-value\"\n";
        std::fs::write(&path, text).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.token_ttl_hours, 2);
        assert!(!config.uses_development_secret());

        let missing = Config::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_database_path_override() {
        let mut config = Config::default();
        config
            .apply_env(|key| (key == "STAYBOOK_DATABASE").then(|| "/tmp/s.db".to_string()))
            .unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/s.db"));
        assert!(config.uses_development_secret());
    }
}
