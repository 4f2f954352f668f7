// src/core/report.rs — Durable JSON report of one optimization run
//
// The report file is written once, atomically (temp file + rename), and never
// rewritten. A second run in the same second gets a numbered file name.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::types::OptimizationReport;
use crate::infra::errors::OptimizerError;
use crate::infra::paths;

const MAX_NAME_ATTEMPTS: u32 = 1000;

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Preferred file for the report of `timestamp`.
    fn path_for(&self, timestamp: i64) -> PathBuf {
        self.dir.join(paths::report_file_name(timestamp))
    }

    /// `path_for`, then `..._{timestamp}_1.json`, `_2`, ... for runs that
    /// finish within the same second.
    fn candidate(&self, timestamp: i64, attempt: u32) -> PathBuf {
        if attempt == 0 {
            return self.path_for(timestamp);
        }
        let name = paths::report_file_name(timestamp);
        let stem = name.trim_end_matches(".json");
        self.dir.join(format!("{stem}_{attempt}.json"))
    }

    /// Claim a report path that no earlier run has used.
    fn reserve(&self, timestamp: i64) -> Result<PathBuf, OptimizerError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.candidate(timestamp, attempt);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(OptimizerError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free report name for timestamp {timestamp}"),
        )))
    }

    /// Write the report to a fresh file. Existing reports are never replaced.
    pub fn write(&self, report: &OptimizationReport) -> Result<PathBuf, OptimizerError> {
        std::fs::create_dir_all(&self.dir)?;

        let json = serde_json::to_string_pretty(report)?;
        let dst = self.reserve(report.timestamp)?;
        let tmp = self.dir.join(format!(
            ".{}.tmp",
            dst.file_name().and_then(|n| n.to_str()).unwrap_or("report")
        ));

        if let Err(e) = write_and_swap(&tmp, &dst, json.as_bytes()) {
            let _ = std::fs::remove_file(&tmp);
            let _ = std::fs::remove_file(&dst);
            return Err(e.into());
        }

        tracing::debug!("Report written to {}", dst.display());
        Ok(dst)
    }
}

/// Temp file, fsync, then rename over the reserved (empty) destination.
fn write_and_swap(tmp: &Path, dst: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = std::fs::File::create(tmp)?;
    f.write_all(bytes)?;
    f.flush()?;
    f.sync_all()?;
    std::fs::rename(tmp, dst)
}

/// Read a report back, e.g. to compare runs.
pub fn load_report(path: &Path) -> Result<OptimizationReport, OptimizerError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
