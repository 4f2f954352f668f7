// src/infra/paths.rs — Default file locations
//
// The config file respects FACTOR_OPTIMIZER_HOME for isolation. Credentials,
// the operator catalog and reports default to the working directory, which is
// where the optimizer is normally launched from.

use directories::ProjectDirs;
use std::path::PathBuf;

pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.txt";
pub const DEFAULT_OPERATORS_FILE: &str = "operators.txt";
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// Returns the FACTOR_OPTIMIZER_HOME override, if set.
fn optimizer_home() -> Option<PathBuf> {
    std::env::var_os("FACTOR_OPTIMIZER_HOME").map(PathBuf::from)
}

/// Configuration directory: $FACTOR_OPTIMIZER_HOME/ or the platform config dir.
/// Falls back to the working directory when no home directory can be found.
pub fn config_dir() -> PathBuf {
    if let Some(home) = optimizer_home() {
        return home;
    }
    ProjectDirs::from("", "", "factor-optimizer")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// File name of the report for a run started at `timestamp` (Unix seconds).
pub fn report_file_name(timestamp: i64) -> String {
    format!("factor_optimization_results_{timestamp}.json")
}
