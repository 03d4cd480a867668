use std::path::PathBuf;
use std::time::Duration;

use crate::db::Database;

/// Runtime configuration, read from the environment.
///
/// - `JOBTRACK_DB`: SQLite file (default: the platform data dir, see `Database::default_path`)
/// - `JOBTRACK_CATALOG`: JSON job catalog (default: bundled sample catalog)
/// - `JOBTRACK_DIGEST_DELAY_MS`: pause before generating a digest (default: 0)
/// - `JOBTRACK_EMAIL`: default recipient for digest mail links
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub digest_delay: Duration,
    pub email: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            db_path: non_empty("JOBTRACK_DB")
                .map(|p| PathBuf::from(expand_home(&p)))
                .unwrap_or_else(Database::default_path),
            catalog_path: non_empty("JOBTRACK_CATALOG").map(|p| PathBuf::from(expand_home(&p))),
            digest_delay: non_empty("JOBTRACK_DIGEST_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
            email: non_empty("JOBTRACK_EMAIL"),
        }
    }
}

// Expand ~ in path
fn expand_home(path: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            format!("{}/{}", home, rest)
        }
        None => path.to_string(),
    }
}
