//! System cleanup: empty the recycle bin, then sweep the temporary
//! directory and the system temp directory's stray log files.
//!
//! The filesystem sweeps are time-budgeted; entries that cannot be
//! removed are reported individually and skipped, never fatal.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{ps_command, OpCtx};
use crate::i18n::Msg;
use crate::model::ToolRequest;

const SWEEP_BUDGET: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
pub(crate) struct SweepReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub budget_exceeded: bool,
}

pub async fn run(ctx: &OpCtx<'_>) -> Result<()> {
    info!("starting system cleanup");
    ctx.say(Msg::CleanupStarting);

    empty_recycle_bin(ctx).await;

    ctx.say(Msg::CleaningTemp);
    let temp = std::env::temp_dir();
    let report = tokio::task::spawn_blocking(move || sweep_directory(&temp, SWEEP_BUDGET)).await?;
    emit_report(ctx, &report);
    let mut removed = report.removed.len();
    let mut failed = report.failed.len();

    if let Some(dir) = system_temp_dir() {
        ctx.say(Msg::CleaningLogs);
        let report =
            tokio::task::spawn_blocking(move || remove_log_files(&dir, SWEEP_BUDGET)).await?;
        emit_report(ctx, &report);
        removed += report.removed.len();
        failed += report.failed.len();
    }

    ctx.bridge.emit(&format!(
        "{}: {removed} / {failed}",
        ctx.tr.text(Msg::CleanupComplete)
    ));
    Ok(())
}

/// The recycle bin has no filesystem surface, so emptying it goes
/// through the Runner like every other external effect.
async fn empty_recycle_bin(ctx: &OpCtx<'_>) {
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ps_command("Clear-RecycleBin -Force -ErrorAction SilentlyContinue"),
            ctx.timeouts.cleanup,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::RecycleBinCleaned);
    } else {
        ctx.say(Msg::RecycleBinFailed);
        ctx.report_failure(&outcome);
    }
}

fn emit_report(ctx: &OpCtx<'_>, report: &SweepReport) {
    for path in &report.removed {
        ctx.bridge
            .emit(&format!("{}: {}", ctx.tr.text(Msg::CleanupRemoved), path.display()));
    }
    for (path, err) in &report.failed {
        ctx.bridge.emit(&format!(
            "{}: {} ({err})",
            ctx.tr.text(Msg::CleanupRemoveFailed),
            path.display()
        ));
    }
    if report.budget_exceeded {
        ctx.say(Msg::CleanupBudget);
    }
}

/// Delete everything under `dir` (not `dir` itself): files first, then
/// the directories they leave empty.
pub(crate) fn sweep_directory(dir: &Path, budget: Duration) -> SweepReport {
    let started = Instant::now();
    let mut report = SweepReport::default();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if started.elapsed() > budget {
            report.budget_exceeded = true;
            break;
        }
        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            std::fs::remove_dir(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => report.removed.push(path.to_path_buf()),
            Err(err) => {
                debug!(path = %path.display(), %err, "could not remove entry");
                report.failed.push((path.to_path_buf(), err.to_string()));
            }
        }
    }
    report
}

/// Delete stray `*.log` files under `dir`.
pub(crate) fn remove_log_files(dir: &Path, budget: Duration) -> SweepReport {
    let started = Instant::now();
    let mut report = SweepReport::default();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if started.elapsed() > budget {
            report.budget_exceeded = true;
            break;
        }
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "log") {
            continue;
        }
        match std::fs::remove_file(path) {
            Ok(()) => report.removed.push(path.to_path_buf()),
            Err(err) => report.failed.push((path.to_path_buf(), err.to_string())),
        }
    }
    report
}

/// `%SystemRoot%\Temp` when running on a Windows host.
fn system_temp_dir() -> Option<PathBuf> {
    let root = std::env::var_os("SystemRoot")?;
    let dir = PathBuf::from(root).join("Temp");
    dir.is_dir().then_some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn sweep_removes_files_and_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tmp"), "x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.tmp"), "x").unwrap();

        let report = sweep_directory(dir.path(), Duration::from_secs(5));

        assert_eq!(report.removed.len(), 3);
        assert!(report.failed.is_empty());
        assert!(!report.budget_exceeded);
        assert!(dir.path().exists(), "the root itself is kept");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn log_sweep_only_touches_log_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.log"), "x").unwrap();
        fs::write(dir.path().join("data.txt"), "x").unwrap();

        let report = remove_log_files(dir.path(), Duration::from_secs(5));

        assert_eq!(report.removed.len(), 1);
        assert!(dir.path().join("data.txt").exists());
        assert!(!dir.path().join("old.log").exists());
    }

    #[test]
    fn an_exhausted_budget_stops_the_sweep() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            fs::write(dir.path().join(format!("f{i}.tmp")), "x").unwrap();
        }

        let report = sweep_directory(dir.path(), Duration::ZERO);

        assert!(report.budget_exceeded);
        assert!(report.removed.len() < 10);
    }
}
