// Configuration read from the environment (.env loaded by dotenv)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    /// Directory holding diagnosis_model.json + diagnosis_features.json
    pub model_dir: PathBuf,
    /// 0 disables the daily unit summary job
    pub summary_interval_secs: u64,
    pub tank_density_kg_m3: f64,
    pub cage_density_kg_m3: f64,
    /// First staff account, created at startup when the users table is empty
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_or("PORT", 8080)?,
            model_dir: PathBuf::from(env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string())),
            summary_interval_secs: parse_or("SUMMARY_INTERVAL_SECS", 86_400)?,
            tank_density_kg_m3: parse_or("TANK_DENSITY_KG_M3", 25.0)?,
            cage_density_kg_m3: parse_or("CAGE_DENSITY_KG_M3", 15.0)?,
            admin_username: env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            model_dir: PathBuf::from("does-not-exist"),
            summary_interval_secs: 0,
            tank_density_kg_m3: 25.0,
            cage_density_kg_m3: 15.0,
            admin_username: None,
            admin_password: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_default_when_unset() {
        let value: u16 = parse_or("SIERRA_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(value, 8080);
    }
}
