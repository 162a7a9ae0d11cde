use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{Result, anyhow};
use chrono::TimeDelta;
use tracing::{info, warn};

use crate::eligibility::DeptMatch;

const DEV_SECRET: &str = "placement-dev-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub debug: bool,
    pub cors_origin: Option<String>,
    pub dept_match: DeptMatch,
}

impl Config {
    pub fn load() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_SECRET.to_string()
        });

        let config = Self {
            port: try_load("PLACEMENT_PORT", "5000")?,
            database_path: match env::var("PLACEMENT_DB") {
                Ok(path) => PathBuf::from(path),
                Err(_) => default_data_dir().join("placement.db"),
            },
            upload_dir: match env::var("PLACEMENT_UPLOAD_DIR") {
                Ok(path) => PathBuf::from(path),
                Err(_) => default_data_dir().join("uploads"),
            },
            jwt_secret,
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "24")?,
            debug: try_load("PLACEMENT_DEBUG", "false")?,
            cors_origin: env::var("PLACEMENT_CORS_ORIGIN").ok(),
            dept_match: try_load("DEPT_MATCH", "substring")?,
        };
        config.token_ttl()?;
        Ok(config)
    }

    /// Token lifetime. Must be a positive number of hours that fits a `TimeDelta`.
    pub fn token_ttl(&self) -> Result<TimeDelta> {
        let hours = self.token_ttl_hours;
        if hours <= 0 {
            return Err(anyhow!("Invalid TOKEN_TTL_HOURS value '{hours}': must be positive"));
        }
        TimeDelta::try_hours(hours)
            .ok_or_else(|| anyhow!("Invalid TOKEN_TTL_HOURS value '{hours}': out of range"))
    }

    /// Config rooted in one directory, for tests and throwaway instances.
    pub fn at(dir: &std::path::Path) -> Self {
        Self {
            port: 0,
            database_path: dir.join("placement.db"),
            upload_dir: dir.join("uploads"),
            jwt_secret: DEV_SECRET.to_string(),
            token_ttl_hours: 24,
            debug: false,
            cors_origin: None,
            dept_match: DeptMatch::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    // XDG data directory or fallback
    match directories::ProjectDirs::from("", "", "placement") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("."),
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow!("Invalid {key} value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_load_uses_default_when_unset() {
        let port: u16 = try_load("PLACEMENT_TEST_SURELY_UNSET_PORT", "5000").unwrap();
        assert_eq!(port, 5000);
        let mode: DeptMatch = try_load("PLACEMENT_TEST_SURELY_UNSET_MODE", "exact").unwrap();
        assert_eq!(mode, DeptMatch::Exact);
    }

    #[test]
    fn test_try_load_rejects_bad_default() {
        let result: Result<u16> = try_load("PLACEMENT_TEST_SURELY_UNSET_PORT", "not-a-port");
        assert!(result.is_err());
    }

    #[test]
    fn test_token_ttl_must_be_positive_and_in_range() {
        let mut config = Config::at(std::path::Path::new("/tmp/x"));
        assert_eq!(config.token_ttl().unwrap(), TimeDelta::hours(24));

        for bad in [0, -5, 9_000_000_000_000, i64::MAX] {
            config.token_ttl_hours = bad;
            let err = config.token_ttl().unwrap_err();
            assert!(err.to_string().contains("TOKEN_TTL_HOURS"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_config_at_dir() {
        let config = Config::at(std::path::Path::new("/tmp/x"));
        assert_eq!(config.database_path, PathBuf::from("/tmp/x/placement.db"));
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/x/uploads"));
        assert_eq!(config.dept_match, DeptMatch::Substring);
    }
}
