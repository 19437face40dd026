use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::i18n::Msg;

/// One entry of the fixed maintenance menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SystemFileCheck,
    DismRepair,
    DismAutoRepair,
    DiskCheckSingle,
    DiskCheckAll,
    BootRepair,
    NetworkReset,
    GpuInfo,
    GpuMonitor,
    Cleanup,
    QuickScan,
    FullScan,
    CustomScan,
    UpdateDefinitions,
}

impl ToolKind {
    pub const MENU: [ToolKind; 14] = [
        ToolKind::SystemFileCheck,
        ToolKind::DismRepair,
        ToolKind::DismAutoRepair,
        ToolKind::DiskCheckSingle,
        ToolKind::DiskCheckAll,
        ToolKind::BootRepair,
        ToolKind::NetworkReset,
        ToolKind::GpuInfo,
        ToolKind::GpuMonitor,
        ToolKind::Cleanup,
        ToolKind::QuickScan,
        ToolKind::FullScan,
        ToolKind::CustomScan,
        ToolKind::UpdateDefinitions,
    ];

    pub fn label(self) -> Msg {
        match self {
            ToolKind::SystemFileCheck => Msg::ToolSfc,
            ToolKind::DismRepair => Msg::ToolDism,
            ToolKind::DismAutoRepair => Msg::ToolDismAuto,
            ToolKind::DiskCheckSingle => Msg::ToolDiskCheckOne,
            ToolKind::DiskCheckAll => Msg::ToolDiskCheckAll,
            ToolKind::BootRepair => Msg::ToolBootRepair,
            ToolKind::NetworkReset => Msg::ToolNetworkReset,
            ToolKind::GpuInfo => Msg::ToolGpuInfo,
            ToolKind::GpuMonitor => Msg::ToolGpuMonitor,
            ToolKind::Cleanup => Msg::ToolCleanup,
            ToolKind::QuickScan => Msg::ToolQuickScan,
            ToolKind::FullScan => Msg::ToolFullScan,
            ToolKind::CustomScan => Msg::ToolCustomScan,
            ToolKind::UpdateDefinitions => Msg::ToolUpdateDefs,
        }
    }

    /// Polling tools keep running until the cancel flag is raised.
    pub fn is_polling(self) -> bool {
        matches!(self, ToolKind::GpuMonitor)
    }
}

/// One external command invocation: discrete argument vector plus a bound
/// on how long the Runner will wait for it. Never a shell string.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub command: Vec<String>,
    pub timeout: Duration,
}

impl ToolRequest {
    pub fn new<I, S>(command: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            timeout,
        }
    }
}

/// Closed failure taxonomy for external command invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("command timed out")]
    Timeout,
    #[error("tool not found on the search path")]
    ToolNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("command exited with a non-zero status")]
    NonZeroExit,
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

/// Immutable result record of one external command invocation.
///
/// Invariant: `failure.is_none()` iff `exit_code == Some(0)`.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub failure: Option<FailureKind>,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Orchestrator run-state machine. `Running` is exclusive per application
/// instance; the terminal states are reported to the surface and the
/// machine returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Advisory severity class for a line of operation output. Derived from
/// keyword matching for display styling only; the failure classification
/// never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct OutputLine {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Confirm,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    Confirmed(bool),
    Line(String),
    Dismissed,
}

/// A modal prompt posted by a worker-side bridge to the surface thread.
/// The reply channel is consumed exactly once; dropping it without
/// answering reads as a dismissal.
#[derive(Debug)]
pub struct DialogRequest {
    pub kind: DialogKind,
    pub prompt: String,
    pub reply: oneshot::Sender<DialogReply>,
}

/// Events flowing from the orchestrator/worker side to the presentation
/// surface.
#[derive(Debug)]
pub enum SurfaceEvent {
    Line(OutputLine),
    Dialog(DialogRequest),
    ToolStarted { tool: ToolKind },
    ToolFinished { tool: ToolKind, state: RunState },
}
