//! TUI-side implementation of the Bridge.
//!
//! The worker task never touches the terminal. Output is posted to the
//! surface event channel; modal prompts carry a oneshot reply channel
//! and block the calling worker until the UI thread answers. A mutex
//! serializes prompts so at most one modal request is outstanding at a
//! time, and prompts are served strictly in the order requested.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{oneshot, Mutex};

use super::{classify, Bridge, ReadOutcome};
use crate::model::{DialogKind, DialogReply, DialogRequest, OutputLine, SurfaceEvent};

pub struct SurfaceBridge {
    // Non-owning handle to the surface; the presentation layer owns the
    // receiving end and may go away mid-operation.
    events: UnboundedSender<SurfaceEvent>,
    dialog_slot: Mutex<()>,
}

impl SurfaceBridge {
    pub fn new(events: UnboundedSender<SurfaceEvent>) -> Self {
        Self {
            events,
            dialog_slot: Mutex::new(()),
        }
    }

    async fn ask(&self, kind: DialogKind, prompt: &str) -> Option<DialogReply> {
        // Held across the await: the second prompt blocks the worker, not
        // the UI thread, until the first dialog resolves.
        let _slot = self.dialog_slot.lock().await;
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = DialogRequest {
            kind,
            prompt: prompt.to_string(),
            reply: reply_tx,
        };
        if self.events.send(SurfaceEvent::Dialog(request)).is_err() {
            // Surface torn down: degrade to the declined/cancelled value.
            return None;
        }
        reply_rx.await.ok()
    }
}

#[async_trait]
impl Bridge for SurfaceBridge {
    fn emit(&self, text: &str) {
        let line = OutputLine {
            severity: classify(text),
            text: text.to_string(),
        };
        let _ = self.events.send(SurfaceEvent::Line(line));
    }

    async fn confirm(&self, prompt: &str) -> bool {
        matches!(
            self.ask(DialogKind::Confirm, prompt).await,
            Some(DialogReply::Confirmed(true))
        )
    }

    async fn read_line(&self, prompt: &str, _limit: Duration) -> ReadOutcome {
        // The dialog stays open as long as it takes; only a dismissal or a
        // torn-down surface cancels the read.
        match self.ask(DialogKind::Input, prompt).await {
            Some(DialogReply::Line(line)) => ReadOutcome::Line(line),
            _ => ReadOutcome::TimedOut,
        }
    }
}
