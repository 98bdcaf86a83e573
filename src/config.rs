//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::ServiceError;

/// Which traffic ledger implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedgerBackend {
    /// MySQL `traffic_log` table.
    #[default]
    Mysql,
    /// Process-local ledger, lost on restart.
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Database ===
    /// MySQL server host.
    #[serde(default = "default_mysql_host")]
    pub mysql_host: String,

    /// MySQL user.
    #[serde(default = "default_mysql_user")]
    pub mysql_user: String,

    /// MySQL password.
    #[serde(default)]
    pub mysql_password: String,

    /// MySQL database name.
    #[serde(default = "default_mysql_db")]
    pub mysql_db: String,

    /// MySQL server port.
    #[serde(default = "default_mysql_port")]
    pub mysql_port: u16,

    /// Upper bound on pooled ledger connections.
    #[serde(default = "default_max_connections")]
    pub mysql_max_connections: u32,

    /// Seconds to wait for a ledger connection before reporting it unavailable.
    #[serde(default = "default_connect_timeout")]
    pub mysql_connect_timeout_secs: u64,

    /// Ledger implementation.
    #[serde(default)]
    pub ledger_backend: LedgerBackend,

    // === Snapshot ===
    /// Detection snapshot written by the vision pipeline.
    #[serde(default = "default_predictions_path")]
    pub predictions_file_path: PathBuf,

    /// Directory served under `/static` (holds the latest camera frames).
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    // === Congestion ===
    /// Inclusive upper bounds of the `low` and `medium` tiers, e.g. `10,25`.
    #[serde(default = "default_thresholds")]
    pub congestion_thresholds: Vec<u32>,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_mysql_host() -> String {
    "127.0.0.1".to_string()
}

fn default_mysql_user() -> String {
    "root".to_string()
}

fn default_mysql_db() -> String {
    "bike_management".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_max_connections() -> u32 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_predictions_path() -> PathBuf {
    PathBuf::from("static/results/predictions.json")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_thresholds() -> Vec<u32> {
    vec![10, 25]
}

fn default_port() -> u16 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mysql_host: default_mysql_host(),
            mysql_user: default_mysql_user(),
            mysql_password: String::new(),
            mysql_db: default_mysql_db(),
            mysql_port: default_mysql_port(),
            mysql_max_connections: default_max_connections(),
            mysql_connect_timeout_secs: default_connect_timeout(),
            ledger_backend: LedgerBackend::default(),
            predictions_file_path: default_predictions_path(),
            static_dir: default_static_dir(),
            congestion_thresholds: default_thresholds(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Load configuration and reject invalid values.
    pub fn load_validated() -> crate::Result<Self> {
        let config = Self::load()?;
        config.validate().map_err(ServiceError::InvalidConfig)?;
        Ok(config)
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.congestion_thresholds.len() != 2 {
            return Err(format!(
                "CONGESTION_THRESHOLDS must hold exactly 2 bounds (low,medium), got {}",
                self.congestion_thresholds.len()
            ));
        }

        if self.congestion_thresholds[0] >= self.congestion_thresholds[1] {
            return Err("CONGESTION_THRESHOLDS must be strictly ascending".to_string());
        }

        if self.ledger_backend == LedgerBackend::Mysql {
            if self.mysql_host.is_empty() {
                return Err("MYSQL_HOST is required".to_string());
            }
            if self.mysql_db.is_empty() {
                return Err("MYSQL_DB is required".to_string());
            }
            if self.mysql_port == 0 {
                return Err("MYSQL_PORT must be non-zero".to_string());
            }
            if self.mysql_max_connections == 0 {
                return Err("MYSQL_MAX_CONNECTIONS must be at least 1".to_string());
            }
        }

        Ok(())
    }

    /// Inclusive upper bound of the `low` tier.
    pub fn low_max(&self) -> u32 {
        self.congestion_thresholds.first().copied().unwrap_or(10)
    }

    /// Inclusive upper bound of the `medium` tier.
    pub fn medium_max(&self) -> u32 {
        self.congestion_thresholds.get(1).copied().unwrap_or(25)
    }
}
