use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Result};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::app_dirs::AppDirs;

/// One focus interval: how long a field held focus during a run.
#[derive(Debug, Clone)]
pub struct FieldStat {
    pub field: String,
    pub dwell_ms: u64,
    pub condition_code: String,
    pub run_number: i64,
    pub timestamp: DateTime<Local>,
}

/// Database manager for per-field dwell statistics
#[derive(Debug)]
pub struct StatsDb {
    conn: Connection,
}

impl StatsDb {
    /// Initialize the database connection and create tables if needed
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("formlab_stats.db"));

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
                    Some(format!("Failed to create directory: {}", e)),
                )
            })?;
        }

        let conn = Connection::open(&db_path)?;
        Self::from_connection(conn)
    }

    /// Build a store over an already-open connection (in-memory dbs in tests)
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS field_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                field TEXT NOT NULL,
                dwell_ms INTEGER NOT NULL,
                condition_code TEXT NOT NULL,
                run_number INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_field_stats_field ON field_stats(field)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_field_stats_timestamp ON field_stats(timestamp)",
            [],
        )?;

        Ok(StatsDb { conn })
    }

    /// Record a single dwell interval
    pub fn record_field_stat(&self, stat: &FieldStat) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO field_stats
            (field, dwell_ms, condition_code, run_number, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                stat.field,
                stat.dwell_ms,
                stat.condition_code,
                stat.run_number,
                stat.timestamp.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    /// Record one run's intervals in a single transaction
    pub fn record_field_stats_batch(&mut self, stats: &[FieldStat]) -> Result<()> {
        let tx = self.conn.transaction()?;

        for stat in stats {
            tx.execute(
                r#"
                INSERT INTO field_stats
                (field, dwell_ms, condition_code, run_number, timestamp)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    stat.field,
                    stat.dwell_ms,
                    stat.condition_code,
                    stat.run_number,
                    stat.timestamp.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Get recorded intervals for a specific field, newest first
    pub fn get_field_stats(&self, field: &str) -> Result<Vec<FieldStat>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT field, dwell_ms, condition_code, run_number, timestamp
            FROM field_stats
            WHERE field = ?1
            ORDER BY timestamp DESC
            "#,
        )?;

        let stat_iter = stmt.query_map([field], |row| {
            let timestamp_str: String = row.get(4)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        4,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(FieldStat {
                field: row.get(0)?,
                dwell_ms: row.get(1)?,
                condition_code: row.get(2)?,
                run_number: row.get(3)?,
                timestamp,
            })
        })?;

        let mut stats = Vec::new();
        for stat in stat_iter {
            stats.push(stat?);
        }

        Ok(stats)
    }

    /// Average dwell time for a field across all recorded runs
    pub fn get_avg_dwell(&self, field: &str) -> Result<Option<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT AVG(dwell_ms) FROM field_stats WHERE field = ?1")?;

        let avg: Option<f64> = stmt.query_row([field], |row| row.get(0))?;
        Ok(avg)
    }

    /// Per-field summary: (field, avg dwell, avg under all-at-once,
    /// avg under grouped, samples). The motion factor is the first character
    /// of the condition code.
    pub fn get_all_field_summary(&self) -> Result<Vec<(String, f64, f64, f64, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                field,
                AVG(dwell_ms) as avg_dwell,
                AVG(CASE WHEN SUBSTR(condition_code, 1, 1) = '0' THEN dwell_ms END) as avg_all_at_once,
                AVG(CASE WHEN SUBSTR(condition_code, 1, 1) = '1' THEN dwell_ms END) as avg_grouped,
                COUNT(*) as samples
            FROM field_stats
            GROUP BY field
            ORDER BY field
            "#,
        )?;

        let summary_iter = stmt.query_map([], |row| {
            let field: String = row.get(0)?;
            let avg_dwell: Option<f64> = row.get(1)?;
            let avg_all_at_once: Option<f64> = row.get(2)?;
            let avg_grouped: Option<f64> = row.get(3)?;
            let samples: i64 = row.get(4)?;

            Ok((
                field,
                avg_dwell.unwrap_or(0.0),
                avg_all_at_once.unwrap_or(0.0),
                avg_grouped.unwrap_or(0.0),
                samples,
            ))
        })?;

        let mut summary = Vec::new();
        for item in summary_iter {
            summary.push(item?);
        }

        Ok(summary)
    }

    /// Timestamp of the most recent recorded interval, if any
    pub fn last_recorded(&self) -> Result<Option<DateTime<Local>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT MAX(timestamp) FROM field_stats")?;

        let last: Option<String> = stmt.query_row([], |row| row.get(0))?;
        Ok(last.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Local))
        }))
    }

    /// Clear all statistics (for testing or reset purposes)
    pub fn clear_all_stats(&self) -> Result<()> {
        self.conn.execute("DELETE FROM field_stats", [])?;
        Ok(())
    }

    /// Check if the database file exists on disk
    pub fn database_exists() -> bool {
        if let Some(path) = AppDirs::db_path() {
            path.exists()
        } else {
            false
        }
    }
}

/// Helper function to calculate time difference in milliseconds
pub fn time_diff_ms(start: SystemTime, end: SystemTime) -> u64 {
    end.duration_since(start).unwrap_or_default().as_millis() as u64
}
