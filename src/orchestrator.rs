//! Tool run lifecycle controller for the TUI surface.
//!
//! Owns the Idle/Running state machine, dispatches one operation at a
//! time onto a worker task, relays cancellation to polling tools, and
//! reconciles surface state on completion. All UI-visible consequences
//! travel through the surface event channel; the worker never touches
//! the terminal.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bridge::{classify, SurfaceBridge};
use crate::i18n::{Msg, Translator};
use crate::model::{OutputLine, RunState, SurfaceEvent, ToolKind};
use crate::ops::{self, OpCtx};
use crate::runner::Runner;
use crate::settings::Timeouts;

/// Commands emitted by the surface to control the run lifecycle.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start(ToolKind),
    CancelPoll,
    Quit,
}

/// Exclusivity guard for the Running state. Start requests race through
/// `try_begin`; exactly one wins, the rest are rejected, never queued.
#[derive(Debug, Default)]
pub struct RunGuard {
    running: AtomicBool,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

struct ActiveTool {
    kind: ToolKind,
    handle: Option<JoinHandle<Result<()>>>,
    cancel: Arc<AtomicBool>,
}

/// Run the controller loop until the surface asks to quit.
pub(crate) async fn run_controller(
    translator: Translator,
    timeouts: Timeouts,
    event_tx: UnboundedSender<SurfaceEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let guard = RunGuard::new();
    let mut active: Option<ActiveTool> = None;
    let mut quit_pending = false;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Start(kind)) => {
                        if !guard.try_begin() {
                            let _ = event_tx.send(SurfaceEvent::Line(OutputLine {
                                text: translator.text(Msg::AlreadyRunning).to_string(),
                                severity: classify(translator.text(Msg::AlreadyRunning)),
                            }));
                            continue;
                        }
                        info!(?kind, "tool started");
                        let _ = event_tx.send(SurfaceEvent::ToolStarted { tool: kind });
                        let cancel = Arc::new(AtomicBool::new(false));
                        active = Some(spawn_tool(
                            kind,
                            translator,
                            timeouts.clone(),
                            event_tx.clone(),
                            cancel,
                        ));
                    }
                    Some(UiCommand::CancelPoll) => {
                        if let Some(tool) = &active {
                            tool.cancel.store(true, Ordering::Relaxed);
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        quit_pending = true;
                        if let Some(tool) = active.take() {
                            // Abort the worker; kill_on_drop reaps any child
                            // the aborted operation was waiting on.
                            tool.cancel.store(true, Ordering::Relaxed);
                            if let Some(handle) = tool.handle {
                                handle.abort();
                            }
                            guard.finish();
                            info!(kind = ?tool.kind, "tool aborted on quit");
                            let _ = event_tx.send(SurfaceEvent::ToolFinished {
                                tool: tool.kind,
                                state: RunState::Cancelled,
                            });
                        }
                        break;
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it
            // can be dropped when another branch is chosen and completion is
            // never observed.
            maybe_done = async {
                if let Some(tool) = &mut active {
                    if let Some(handle) = tool.handle.as_mut() {
                        return Some(handle.await);
                    }
                }
                futures::future::pending().await
            } => {
                let Some(join_res) = maybe_done else { continue };
                let tool = active.take().expect("active tool on completion");
                let state = match join_res {
                    Ok(Ok(())) => {
                        if tool.kind.is_polling() && tool.cancel.load(Ordering::Relaxed) {
                            RunState::Cancelled
                        } else {
                            RunState::Completed
                        }
                    }
                    Ok(Err(err)) => {
                        error!(kind = ?tool.kind, err = %format!("{err:#}"), "tool failed");
                        let text = format!("{}: {err:#}", translator.text(Msg::OperationFailed));
                        let _ = event_tx.send(SurfaceEvent::Line(OutputLine {
                            severity: classify(&text),
                            text,
                        }));
                        RunState::Failed
                    }
                    Err(join_err) => {
                        error!(kind = ?tool.kind, %join_err, "tool task died");
                        let text = format!("{}: {join_err}", translator.text(Msg::OperationFailed));
                        let _ = event_tx.send(SurfaceEvent::Line(OutputLine {
                            severity: classify(&text),
                            text,
                        }));
                        RunState::Failed
                    }
                };
                guard.finish();
                info!(kind = ?tool.kind, ?state, "tool finished");
                let _ = event_tx.send(SurfaceEvent::ToolFinished {
                    tool: tool.kind,
                    state,
                });
                if quit_pending {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn spawn_tool(
    kind: ToolKind,
    translator: Translator,
    timeouts: Timeouts,
    event_tx: UnboundedSender<SurfaceEvent>,
    cancel: Arc<AtomicBool>,
) -> ActiveTool {
    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let runner = Runner::new();
        let bridge = SurfaceBridge::new(event_tx);
        let ctx = OpCtx {
            runner: &runner,
            bridge: &bridge,
            tr: &translator,
            timeouts: &timeouts,
        };
        ops::run_tool(kind, &ctx, &task_cancel).await
    });
    ActiveTool {
        kind,
        handle: Some(handle),
        cancel,
    }
}
