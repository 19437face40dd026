//! Operations: the policy layer over the Runner and the Bridge.
//!
//! Each operation is a short script that issues Runner calls with its
//! operation-specific timeout, classifies the outcome into translated
//! user-facing messages, and optionally asks follow-up questions through
//! the Bridge. Operations never spawn processes outside the Runner and
//! never touch presentation primitives.

pub mod cleanup;
pub mod defender;
pub mod gpu;
pub mod system;

use anyhow::Result;
use std::sync::atomic::AtomicBool;
use tracing::{error, warn};

use crate::bridge::Bridge;
use crate::i18n::{Msg, Translator};
use crate::model::{FailureKind, ProcessOutcome, ToolKind};
use crate::runner::Runner;
use crate::settings::Timeouts;

/// Everything an operation needs, borrowed for the duration of one run.
pub struct OpCtx<'a> {
    pub runner: &'a Runner,
    pub bridge: &'a dyn Bridge,
    pub tr: &'a Translator,
    pub timeouts: &'a Timeouts,
}

impl OpCtx<'_> {
    pub fn say(&self, msg: Msg) {
        self.bridge.emit(self.tr.text(msg));
    }

    pub async fn confirm_msg(&self, msg: Msg) -> bool {
        let prompt = format!("{} {}", self.tr.text(msg), self.tr.text(Msg::ConfirmSuffix));
        self.bridge.confirm(&prompt).await
    }

    /// Surface a classified failure to the user. The taxonomy is derived
    /// solely from the outcome's failure kind; output text never feeds it.
    pub fn report_failure(&self, outcome: &ProcessOutcome) {
        let Some(failure) = &outcome.failure else {
            return;
        };
        match failure {
            FailureKind::Timeout => {
                warn!("command timed out");
                self.say(Msg::FailTimeout);
                self.say(Msg::FailTimeoutNote);
            }
            FailureKind::ToolNotFound => {
                warn!("required tool missing");
                self.say(Msg::FailToolMissing);
            }
            FailureKind::PermissionDenied => {
                warn!("permission denied");
                self.say(Msg::FailPermission);
                self.say(Msg::FailPermissionHint);
            }
            FailureKind::NonZeroExit => {
                let code = outcome.exit_code.unwrap_or(-1);
                warn!(code, "command exited non-zero");
                self.bridge.emit(&format!(
                    "{} (exit {code}): {}",
                    self.tr.text(Msg::FailNonZero),
                    stderr_snippet(outcome)
                ));
            }
            FailureKind::Unexpected(detail) => {
                // Full detail goes to the log; the user gets the generic line.
                error!(%detail, "unexpected command failure");
                self.bridge
                    .emit(&format!("{}.", self.tr.text(Msg::FailUnexpected)));
            }
        }
    }
}

/// First meaningful line of stderr, for the non-zero-exit message.
fn stderr_snippet(outcome: &ProcessOutcome) -> String {
    outcome
        .stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("-")
        .chars()
        .take(200)
        .collect()
}

/// Case-insensitive marker search over localized tool output.
pub(crate) fn mentions(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(&m.to_lowercase()))
}

/// Build the argument vector for a PowerShell invocation. The command
/// itself is a single discrete argument; no outer shell is involved.
pub(crate) fn ps_command(command: &str) -> Vec<String> {
    [
        "powershell",
        "-NoProfile",
        "-NonInteractive",
        "-Command",
        command,
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Dispatch one menu entry. The cancel flag is only observed by polling
/// tools; everything else runs to completion or failure.
pub async fn run_tool(kind: ToolKind, ctx: &OpCtx<'_>, cancel: &AtomicBool) -> Result<()> {
    match kind {
        ToolKind::SystemFileCheck => system::sfc_scan(ctx).await,
        ToolKind::DismRepair => system::dism_restore(ctx).await,
        ToolKind::DismAutoRepair => system::dism_auto_repair(ctx).await,
        ToolKind::DiskCheckSingle => system::check_single_drive(ctx).await,
        ToolKind::DiskCheckAll => system::check_all_drives(ctx).await,
        ToolKind::BootRepair => system::boot_repair(ctx).await,
        ToolKind::NetworkReset => system::network_reset(ctx).await,
        ToolKind::GpuInfo => gpu::show_gpu_info(ctx).await,
        ToolKind::GpuMonitor => gpu::monitor(ctx, cancel, gpu::POLL_INTERVAL).await,
        ToolKind::Cleanup => cleanup::run(ctx).await,
        ToolKind::QuickScan => defender::quick_scan(ctx).await,
        ToolKind::FullScan => defender::full_scan(ctx).await,
        ToolKind::CustomScan => defender::custom_scan(ctx).await,
        ToolKind::UpdateDefinitions => defender::update_definitions(ctx).await,
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::bridge::ReadOutcome;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted bridge for operation tests: canned confirm/read answers,
    /// captured output.
    #[derive(Default)]
    pub struct ScriptedBridge {
        pub confirms: Mutex<VecDeque<bool>>,
        pub lines: Mutex<VecDeque<ReadOutcome>>,
        pub emitted: Mutex<Vec<String>>,
    }

    impl ScriptedBridge {
        pub fn with_confirms(answers: &[bool]) -> Self {
            Self {
                confirms: Mutex::new(answers.iter().copied().collect()),
                ..Default::default()
            }
        }

        pub fn with_lines(lines: &[ReadOutcome]) -> Self {
            Self {
                lines: Mutex::new(lines.iter().cloned().collect()),
                ..Default::default()
            }
        }

        pub fn emitted(&self) -> Vec<String> {
            self.emitted.lock().unwrap().clone()
        }

        pub fn emitted_contains(&self, needle: &str) -> bool {
            self.emitted().iter().any(|l| l.contains(needle))
        }
    }

    #[async_trait]
    impl Bridge for ScriptedBridge {
        fn emit(&self, text: &str) {
            self.emitted.lock().unwrap().push(text.to_string());
        }

        async fn confirm(&self, _prompt: &str) -> bool {
            self.confirms.lock().unwrap().pop_front().unwrap_or(false)
        }

        async fn read_line(&self, _prompt: &str, _limit: Duration) -> ReadOutcome {
            self.lines
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ReadOutcome::TimedOut)
        }
    }

    pub fn test_ctx<'a>(
        runner: &'a Runner,
        bridge: &'a ScriptedBridge,
        tr: &'a Translator,
        timeouts: &'a Timeouts,
    ) -> OpCtx<'a> {
        OpCtx {
            runner,
            bridge,
            tr,
            timeouts,
        }
    }
}
