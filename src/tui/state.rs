use tokio::sync::oneshot;

use crate::model::{DialogKind, DialogReply, DialogRequest, OutputLine, RunState, ToolKind};

/// A modal prompt currently owned by the UI thread. The reply sender is
/// consumed exactly once; dropping it unanswered reads as a dismissal on
/// the worker side.
pub struct ActiveDialog {
    pub kind: DialogKind,
    pub prompt: String,
    pub buffer: String,
    reply: Option<oneshot::Sender<DialogReply>>,
}

impl ActiveDialog {
    pub fn new(request: DialogRequest) -> Self {
        Self {
            kind: request.kind,
            prompt: request.prompt,
            buffer: String::new(),
            reply: Some(request.reply),
        }
    }

    fn answer(mut self, reply: DialogReply) {
        if let Some(tx) = self.reply.take() {
            let _ = tx.send(reply);
        }
    }
}

pub struct UiState {
    pub selected: usize,
    pub output: Vec<OutputLine>,
    pub running: Option<ToolKind>,
    pub last_finished: Option<(ToolKind, RunState)>,
    pub dialog: Option<ActiveDialog>,
    pub tick: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: 0,
            output: Vec::new(),
            running: None,
            last_finished: None,
            dialog: None,
            tick: 0,
        }
    }
}

impl UiState {
    pub fn push_line(&mut self, line: OutputLine) {
        // Bounded scrollback; the log file keeps the full record.
        const MAX: usize = 500;
        self.output.push(line);
        if self.output.len() > MAX {
            let _ = self.output.drain(0..(self.output.len() - MAX));
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(ToolKind::MENU.len() - 1);
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % ToolKind::MENU.len();
    }

    pub fn selected_tool(&self) -> ToolKind {
        ToolKind::MENU[self.selected]
    }

    /// Resolve the open dialog, if any, releasing the worker blocked on it.
    pub fn answer_dialog(&mut self, reply: DialogReply) {
        if let Some(dialog) = self.dialog.take() {
            dialog.answer(reply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    #[test]
    fn selection_wraps_both_ways() {
        let mut state = UiState::default();
        state.select_prev();
        assert_eq!(state.selected, ToolKind::MENU.len() - 1);
        state.select_next();
        assert_eq!(state.selected, 0);
        assert_eq!(state.selected_tool(), ToolKind::MENU[0]);
    }

    #[test]
    fn scrollback_is_bounded() {
        let mut state = UiState::default();
        for i in 0..600 {
            state.push_line(OutputLine {
                text: format!("line {i}"),
                severity: Severity::Normal,
            });
        }
        assert_eq!(state.output.len(), 500);
        assert_eq!(state.output.first().unwrap().text, "line 100");
        assert_eq!(state.output.last().unwrap().text, "line 599");
    }

    #[tokio::test]
    async fn answering_a_dialog_releases_the_reply_channel() {
        let (tx, rx) = oneshot::channel();
        let mut state = UiState::default();
        state.dialog = Some(ActiveDialog::new(DialogRequest {
            kind: DialogKind::Confirm,
            prompt: "Proceed?".into(),
            reply: tx,
        }));

        state.answer_dialog(DialogReply::Confirmed(true));
        assert!(state.dialog.is_none());
        assert_eq!(rx.await.unwrap(), DialogReply::Confirmed(true));
    }

    #[tokio::test]
    async fn a_dropped_dialog_reads_as_dismissal() {
        let (tx, rx) = oneshot::channel::<DialogReply>();
        {
            let mut state = UiState::default();
            state.dialog = Some(ActiveDialog::new(DialogRequest {
                kind: DialogKind::Input,
                prompt: "path?".into(),
                reply: tx,
            }));
            // State dropped with the dialog still open, e.g. on quit.
        }
        assert!(rx.await.is_err());
    }
}
