//! Interactive I/O Bridge.
//!
//! Operations talk to the user exclusively through this trait, so the
//! same operation body runs unchanged against the blocking console and
//! the TUI surface. No operation touches a console or terminal primitive
//! directly.

pub mod console;
pub mod surface;

use async_trait::async_trait;
use std::time::Duration;

use crate::model::Severity;

pub use console::ConsoleBridge;
pub use surface::SurfaceBridge;

/// Result of a timeout-bounded line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    TimedOut,
}

#[async_trait]
pub trait Bridge: Send + Sync {
    /// Append a line of output. Never blocks and never fails; a torn-down
    /// surface turns this into a no-op.
    fn emit(&self, text: &str);

    /// Ask a yes/no question. A torn-down surface answers `false`.
    async fn confirm(&self, prompt: &str) -> bool;

    /// Ask for a line of input, bounded by `limit` where the surface
    /// supports it. A torn-down surface answers `TimedOut`.
    async fn read_line(&self, prompt: &str, limit: Duration) -> ReadOutcome;
}

/// Advisory display classification for a line of output. Pure
/// presentation heuristic: the error taxonomy is derived from exit
/// status and spawn errors, never from this.
pub fn classify(text: &str) -> Severity {
    let lower = text.to_lowercase();
    const ERROR: &[&str] = &["error", "fail", "denied", "not found", "错误", "失败", "拒绝"];
    const WARNING: &[&str] = &["warning", "timed out", "timeout", "警告", "超时"];
    const SUCCESS: &[&str] = &[
        "complete", "success", "cleaned", "updated", "removed", "repaired", "完成", "成功", "已删除",
    ];
    if ERROR.iter().any(|k| lower.contains(k)) {
        Severity::Error
    } else if WARNING.iter().any(|k| lower.contains(k)) {
        Severity::Warning
    } else if SUCCESS.iter().any(|k| lower.contains(k)) {
        Severity::Success
    } else {
        Severity::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_keyword_based() {
        assert_eq!(classify("Operation failed: tool missing"), Severity::Error);
        assert_eq!(classify("warning: slow disk"), Severity::Warning);
        assert_eq!(classify("Cleanup complete"), Severity::Success);
        assert_eq!(classify("checking drive C:"), Severity::Normal);
        assert_eq!(classify("网络重置完成。"), Severity::Success);
        assert_eq!(classify("操作失败"), Severity::Error);
    }

    #[test]
    fn error_keywords_win_over_success_keywords() {
        // "failed" and "complete" in one line: styled as an error.
        assert_eq!(classify("scan complete but removal failed"), Severity::Error);
    }
}
