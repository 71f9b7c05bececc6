use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "jobsift";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier of the deterministic pipeline behaviour. Bumped whenever the
/// pattern tables or scoring change, so regression baselines stay comparable.
pub const PIPELINE_VERSION: &str = concat!("jobsift-", env!("CARGO_PKG_VERSION"), "+tables.3");

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "JOBSIFT_DATA_DIR";

/// Environment override for the pipeline configuration file.
pub const CONFIG_PATH_ENV: &str = "JOBSIFT_CONFIG";

/// Whether this is a debug build.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "jobsift=debug"
    } else {
        "jobsift=info"
    }
}

/// Get the application data directory.
/// `$JOBSIFT_DATA_DIR` if set, else `~/.jobsift`, else `./.jobsift`.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".jobsift")
}

/// Default location of the regression baseline database.
pub fn baseline_db_path() -> PathBuf {
    app_data_dir().join("baselines.sqlite3")
}
