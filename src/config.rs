//! Runtime configuration from environment variables.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    pub token_secret: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("ROLODEX_PORT", "8080"),
            db_path: env::var("ROLODEX_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_db_path()),
            backup_dir: env::var("ROLODEX_BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir().join("backups")),
            token_secret: env::var("ROLODEX_TOKEN_SECRET").unwrap_or_else(|_| {
                warn!("ROLODEX_TOKEN_SECRET not set, using an insecure default");
                "insecure-dev-secret".to_string()
            }),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn default_data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let dir = data_dir.join("rolodex");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Default database path (~/.local/share/rolodex/rolodex.db)
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("rolodex.db")
}
