//! MySQL-backed traffic ledger.
//!
//! The pool is created lazily, so a database that is down at startup (or
//! goes away later) shows up as [`LedgerError::Unavailable`] on the request
//! that needs it instead of preventing the server from starting.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{MySql, Row};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::LedgerError;

use super::types::{DailyTotals, HistoryPoint, TrafficObservation};
use super::{LedgerSession, TrafficLedger};

const CREATE_TRAFFIC_LOG: &str = r#"
    CREATE TABLE IF NOT EXISTS traffic_log (
        id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
        timestamp DATETIME(6) NOT NULL,
        current_count_on_bridge INT UNSIGNED NOT NULL,
        congestion_level VARCHAR(16) NOT NULL,
        entrance_count INT UNSIGNED NOT NULL DEFAULT 0,
        exit_count INT UNSIGNED NOT NULL DEFAULT 0,
        INDEX idx_traffic_log_timestamp (timestamp)
    ) DEFAULT CHARSET = utf8mb4
"#;

/// Pooled MySQL ledger over the `traffic_log` table.
#[derive(Debug, Clone)]
pub struct MySqlLedger {
    pool: MySqlPool,
}

impl MySqlLedger {
    /// Build a lazily-connecting pool from configuration.
    pub fn from_config(config: &Config) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.mysql_host)
            .port(config.mysql_port)
            .username(&config.mysql_user)
            .password(&config.mysql_password)
            .database(&config.mysql_db)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(config.mysql_max_connections)
            .acquire_timeout(Duration::from_secs(config.mysql_connect_timeout_secs))
            .connect_lazy_with(options);

        Self { pool }
    }

    /// Create the `traffic_log` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(CREATE_TRAFFIC_LOG).execute(&self.pool).await?;
        info!("traffic_log schema ready");
        Ok(())
    }
}

#[async_trait]
impl TrafficLedger for MySqlLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, LedgerError> {
        let conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;
        debug!("Acquired ledger connection");
        Ok(Box::new(MySqlSession { conn }))
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}

/// One pooled connection; returned to the pool on drop.
struct MySqlSession {
    conn: PoolConnection<MySql>,
}

fn count_from_db(value: i64, column: &str) -> Result<u32, LedgerError> {
    u32::try_from(value)
        .map_err(|_| LedgerError::Query(format!("{column} out of range: {value}")))
}

fn total_from_db(value: i64, column: &str) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::Query(format!("{column} out of range: {value}")))
}

fn history_point(row: &MySqlRow) -> Result<HistoryPoint, LedgerError> {
    let timestamp: NaiveDateTime = row.try_get("timestamp")?;
    let value: i64 = row.try_get("current_count")?;
    Ok(HistoryPoint {
        timestamp,
        current_count_on_bridge: count_from_db(value, "current_count_on_bridge")?,
    })
}

#[async_trait]
impl LedgerSession for MySqlSession {
    async fn last_observation(&mut self) -> Result<Option<HistoryPoint>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT timestamp, CAST(current_count_on_bridge AS SIGNED) AS current_count
              FROM traffic_log
             ORDER BY timestamp DESC, id DESC
             LIMIT 1
            "#,
        )
        .fetch_optional(&mut *self.conn)
        .await?;

        row.map(|row| history_point(&row)).transpose()
    }

    async fn append(&mut self, observation: &TrafficObservation) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO traffic_log
                (timestamp, current_count_on_bridge, congestion_level, entrance_count, exit_count)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(observation.timestamp)
        .bind(observation.current_count_on_bridge)
        .bind(observation.congestion_level.as_str())
        .bind(observation.entrance_count)
        .bind(observation.exit_count)
        .execute(&mut *self.conn)
        .await?;
        Ok(())
    }

    async fn daily_totals(&mut self, day: NaiveDate) -> Result<DailyTotals, LedgerError> {
        let start = day.and_time(NaiveTime::MIN);
        let end = day
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX);

        let row = sqlx::query(
            r#"
            SELECT CAST(COALESCE(SUM(entrance_count), 0) AS SIGNED) AS total_in,
                   CAST(COALESCE(SUM(exit_count), 0) AS SIGNED) AS total_out
              FROM traffic_log
             WHERE timestamp >= ? AND timestamp < ?
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(DailyTotals {
            total_in: total_from_db(row.try_get("total_in")?, "total_in")?,
            total_out: total_from_db(row.try_get("total_out")?, "total_out")?,
        })
    }

    async fn history_since(
        &mut self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<HistoryPoint>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT timestamp, CAST(current_count_on_bridge AS SIGNED) AS current_count
              FROM traffic_log
             WHERE timestamp > ?
             ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.iter().map(history_point).collect()
    }
}
