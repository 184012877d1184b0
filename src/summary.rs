use chrono::prelude::*;
use directories::ProjectDirs;
use itertools::Itertools;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::condition::{Condition, CONDITIONS};
use crate::time_series::RunPoint;

/// Outcome of one completed run, immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// 1-based position within the session
    pub run_number: usize,
    /// index into `CONDITIONS`
    pub condition_index: usize,
    /// 3-character factor code, e.g. "011"
    pub code: String,
    pub total_time_ms: u64,
    /// focus-to-focus deltas; interval i runs from timestamp i to i+1
    pub intervals: Vec<u64>,
    /// field ids in focus order, aligned with `intervals`
    pub steps: Vec<String>,
}

impl RunResult {
    pub fn condition(&self) -> &'static Condition {
        &CONDITIONS[self.condition_index]
    }

    /// "email -> phone" style label for interval `i`; the last interval ends
    /// at the completion timestamp.
    pub fn transition_label(&self, i: usize) -> String {
        let from = self.steps.get(i).map(String::as_str).unwrap_or("?");
        let to = self.steps.get(i + 1).map(String::as_str).unwrap_or("done");
        format!("{} -> {}", from, to)
    }
}

/// Condition codes of the completed runs, lexically sorted.
pub fn codes_sorted(results: &[RunResult]) -> Vec<String> {
    results.iter().map(|r| r.code.clone()).sorted().collect()
}

/// Total times in seconds, run order preserved (chart/aggregate input).
pub fn total_times_secs(results: &[RunResult]) -> Vec<f64> {
    results
        .iter()
        .map(|r| r.total_time_ms as f64 / 1000.0)
        .collect()
}

/// Chart points: total completion time over run number.
pub fn run_points(results: &[RunResult]) -> Vec<RunPoint> {
    results
        .iter()
        .map(|r| RunPoint::new(r.run_number as f64, r.total_time_ms as f64 / 1000.0))
        .collect()
}

fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "formlab").map(|pd| pd.config_dir().to_path_buf())
}

/// Append one row per run to the session log in the config dir, emitting the
/// header when the file is first created.
pub fn append_session_log(results: &[RunResult], participant: Option<&str>) -> std::io::Result<()> {
    if let Some(config_dir) = config_dir() {
        let log_path = config_dir.join("sessions.csv");

        std::fs::create_dir_all(&config_dir)?;

        let needs_header = !log_path.exists();

        let mut log_file = OpenOptions::new()
            .write(true)
            .append(true)
            .create(true)
            .open(log_path)?;

        if needs_header {
            writeln!(log_file, "date,participant,run,condition,total_ms")?;
        }

        let date = Local::now().format("%c");
        let who = participant.unwrap_or("");
        for r in results {
            writeln!(
                log_file,
                "{},{},{},{},{}",
                date, who, r.run_number, r.code, r.total_time_ms
            )?;
        }
    }

    Ok(())
}

/// Default target for the explicit summary export.
pub fn default_export_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(format!("summary-{}.csv", Local::now().format("%Y%m%d-%H%M%S"))))
}

/// Write the full summary (intervals included) to `path`.
pub fn export_summary_csv(results: &[RunResult], path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["run", "condition", "total_ms", "intervals_ms"])?;

    for r in results {
        let intervals = r.intervals.iter().map(u64::to_string).join("|");
        writer.write_record([
            r.run_number.to_string(),
            r.code.clone(),
            r.total_time_ms.to_string(),
            intervals,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
