//! File logging: one timestamped log file per session under `logs/`,
//! with startup pruning of old files by count and age. Console output is
//! owned by the Bridge, so the subscriber writes to the file only.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 10;
const MAX_LOG_AGE_DAYS: u64 = 30;

const STAMP: &[FormatItem<'_>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// Install the global subscriber. Returns an error only when the log
/// directory or file cannot be created; the caller decides whether that
/// is fatal.
pub fn init() -> Result<()> {
    let dir = Path::new(LOG_DIR);
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    prune_old_logs(dir, MAX_LOG_FILES, MAX_LOG_AGE_DAYS);

    let stamp = OffsetDateTime::now_utc()
        .format(&STAMP)
        .unwrap_or_else(|_| "now".into());
    let path = dir.join(format!("winmaint_{stamp}.log"));
    let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "session started"
    );
    Ok(())
}

/// Delete old session logs, keeping at most `max_files` and nothing older
/// than `max_age_days`. Failures here are ignored; pruning is best-effort.
fn prune_old_logs(dir: &Path, max_files: usize, max_age_days: u64) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut logs: Vec<_> = entries
        .flatten()
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "log"))
        .filter_map(|e| {
            let modified = e.metadata().and_then(|m| m.modified()).ok()?;
            Some((e.path(), modified))
        })
        .collect();
    // Newest first.
    logs.sort_by(|a, b| b.1.cmp(&a.1));

    let cutoff = SystemTime::now() - Duration::from_secs(max_age_days * 24 * 3600);
    for (idx, (path, modified)) in logs.iter().enumerate() {
        if idx >= max_files || *modified < cutoff {
            let _ = fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pruning_keeps_the_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            let path = dir.path().join(format!("winmaint_{i}.log"));
            fs::write(&path, "x").unwrap();
            // Space the mtimes out so the ordering is deterministic.
            let t = SystemTime::now() - Duration::from_secs(100 - i * 10);
            let f = File::options().write(true).open(&path).unwrap();
            f.set_modified(t).unwrap();
        }

        prune_old_logs(dir.path(), 2, 30);

        let remaining: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(remaining.len(), 2);
    }

    #[test]
    fn pruning_ignores_non_log_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        prune_old_logs(dir.path(), 0, 0);
        assert!(dir.path().join("keep.txt").exists());
    }
}
