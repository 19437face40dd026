//! TUI session: a dedicated UI thread owns the terminal and all modal
//! dialogs, while the orchestrator runs operations on the tokio runtime.
//! The two sides talk only through the surface event channel and the
//! command channel, so the worker side never touches the terminal.

mod state;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Terminal,
};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::i18n::{Msg, Translator};
use crate::model::{DialogKind, DialogReply, RunState, Severity, SurfaceEvent, ToolKind};
use crate::orchestrator::{self, UiCommand};
use crate::settings::Settings;
use state::{ActiveDialog, UiState};

pub async fn run(settings: &Settings, translator: Translator) -> Result<()> {
    // Unbounded channels avoid backpressure between the worker and the UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SurfaceEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // The TUI runs on a dedicated thread to keep all blocking terminal I/O
    // out of the tokio runtime.
    let ui_translator = translator;
    let ui_handle = std::thread::spawn(move || run_threaded(ui_translator, event_rx, cmd_tx));

    let res =
        orchestrator::run_controller(translator, settings.timeouts.clone(), event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    tr: Translator,
    mut event_rx: UnboundedReceiver<SurfaceEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            terminal.draw(|f| draw(f.area(), f, &tr, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid stalling the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if state.dialog.is_some() {
                    handle_dialog_key(&mut state, k.code);
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.select_prev(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.select_next(),
                    (_, KeyCode::Enter) => {
                        // The controller rejects the start itself when a tool
                        // is already running; no gating here.
                        let _ = cmd_tx.send(UiCommand::Start(state.selected_tool()));
                    }
                    (_, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::CancelPoll);
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn apply_event(state: &mut UiState, ev: SurfaceEvent) {
    match ev {
        SurfaceEvent::Line(line) => state.push_line(line),
        // The bridge serializes prompts, so a dialog never arrives while
        // another is open.
        SurfaceEvent::Dialog(request) => state.dialog = Some(ActiveDialog::new(request)),
        SurfaceEvent::ToolStarted { tool } => {
            state.running = Some(tool);
            state.last_finished = None;
        }
        SurfaceEvent::ToolFinished { tool, state: run_state } => {
            state.running = None;
            state.last_finished = Some((tool, run_state));
        }
    }
}

fn handle_dialog_key(state: &mut UiState, code: KeyCode) {
    let Some(dialog) = state.dialog.as_mut() else {
        return;
    };
    let reply = match (dialog.kind, code) {
        (DialogKind::Confirm, KeyCode::Char('y') | KeyCode::Char('Y')) => {
            Some(DialogReply::Confirmed(true))
        }
        (DialogKind::Confirm, KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc) => {
            Some(DialogReply::Confirmed(false))
        }
        (DialogKind::Input, KeyCode::Enter) => {
            Some(DialogReply::Line(std::mem::take(&mut dialog.buffer)))
        }
        (DialogKind::Input, KeyCode::Esc) => Some(DialogReply::Dismissed),
        (DialogKind::Input, KeyCode::Backspace) => {
            dialog.buffer.pop();
            None
        }
        (DialogKind::Input, KeyCode::Char(c)) => {
            dialog.buffer.push(c);
            None
        }
        _ => None,
    };
    if let Some(reply) = reply {
        state.answer_dialog(reply);
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, tr: &Translator, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(0)].as_ref())
        .split(chunks[0]);

    draw_menu(body[0], f, tr, state);
    draw_output(body[1], f, tr, state);
    draw_status(chunks[1], f, tr, state);

    if let Some(dialog) = &state.dialog {
        draw_dialog(area, f, tr, dialog);
    }
}

fn draw_menu(area: Rect, f: &mut ratatui::Frame, tr: &Translator, state: &UiState) {
    // Dim the menu while a tool runs; Enter is rejected by the controller
    // anyway, the dimming just makes the disabled state visible.
    let item_style = if state.running.is_some() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let items: Vec<ListItem> = ToolKind::MENU
        .iter()
        .enumerate()
        .map(|(idx, tool)| {
            ListItem::new(format!("{:2}. {}", idx + 1, tr.text(tool.label()))).style(item_style)
        })
        .collect();

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(tr.text(Msg::TuiMenuTitle)),
        )
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_output(area: Rect, f: &mut ratatui::Frame, tr: &Translator, state: &UiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.output.len().saturating_sub(visible);
    let lines: Vec<Line> = state.output[skip..]
        .iter()
        .map(|line| Line::styled(line.text.clone(), severity_style(line.severity)))
        .collect();

    let output = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(tr.text(Msg::TuiOutputTitle)),
    );
    f.render_widget(output, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, tr: &Translator, state: &UiState) {
    const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

    let text = if let Some(tool) = state.running {
        let spinner = SPINNER[state.tick % SPINNER.len()];
        let mut text = format!(
            "{spinner} {} {}",
            tr.text(Msg::TuiStatusRunning),
            tr.text(tool.label())
        );
        if tool.is_polling() {
            text.push_str(&format!("  ({})", tr.text(Msg::TuiCancelHint)));
        }
        text
    } else {
        let outcome = state.last_finished.map(|(_, run_state)| match run_state {
            RunState::Completed => tr.text(Msg::OperationComplete),
            RunState::Cancelled => tr.text(Msg::OperationCancelled),
            _ => tr.text(Msg::OperationFailed),
        });
        match outcome {
            Some(outcome) => format!("{}  {outcome}", tr.text(Msg::TuiStatusIdle)),
            None => tr.text(Msg::TuiStatusIdle).to_string(),
        }
    };

    let status = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(tr.text(Msg::TuiKeysHint)),
    );
    f.render_widget(status, area);
}

fn draw_dialog(area: Rect, f: &mut ratatui::Frame, tr: &Translator, dialog: &ActiveDialog) {
    let popup = centered_rect(area, 60, 7);

    let mut lines = vec![Line::raw(dialog.prompt.clone()), Line::raw("")];
    let hint = match dialog.kind {
        DialogKind::Confirm => tr.text(Msg::TuiDialogYesNo),
        DialogKind::Input => {
            lines.push(Line::styled(
                format!("> {}_", dialog.buffer),
                Style::default().fg(Color::Cyan),
            ));
            tr.text(Msg::TuiDialogInputHint)
        }
    };
    lines.push(Line::styled(hint, Style::default().fg(Color::Gray)));

    let body = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(Clear, popup);
    f.render_widget(body, popup);
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Normal => Style::default(),
        Severity::Success => Style::default().fg(Color::Green),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Error => Style::default().fg(Color::Red),
    }
}

/// A centered popup rect, clamped to the surrounding area.
fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (area.width * percent_x / 100).max(20).min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DialogRequest;
    use tokio::sync::oneshot;

    fn dialog_state(kind: DialogKind) -> (UiState, oneshot::Receiver<DialogReply>) {
        let (tx, rx) = oneshot::channel();
        let mut state = UiState::default();
        state.dialog = Some(ActiveDialog::new(DialogRequest {
            kind,
            prompt: "prompt".into(),
            reply: tx,
        }));
        (state, rx)
    }

    #[tokio::test]
    async fn y_confirms_and_closes_the_dialog() {
        let (mut state, rx) = dialog_state(DialogKind::Confirm);
        handle_dialog_key(&mut state, KeyCode::Char('y'));
        assert!(state.dialog.is_none());
        assert_eq!(rx.await.unwrap(), DialogReply::Confirmed(true));
    }

    #[tokio::test]
    async fn esc_declines_a_confirm_dialog() {
        let (mut state, rx) = dialog_state(DialogKind::Confirm);
        handle_dialog_key(&mut state, KeyCode::Esc);
        assert_eq!(rx.await.unwrap(), DialogReply::Confirmed(false));
    }

    #[tokio::test]
    async fn typed_input_round_trips_through_the_dialog() {
        let (mut state, rx) = dialog_state(DialogKind::Input);
        for c in "C:\\data".chars() {
            handle_dialog_key(&mut state, KeyCode::Char(c));
        }
        handle_dialog_key(&mut state, KeyCode::Backspace);
        handle_dialog_key(&mut state, KeyCode::Enter);
        assert_eq!(rx.await.unwrap(), DialogReply::Line("C:\\dat".into()));
    }

    #[tokio::test]
    async fn esc_dismisses_an_input_dialog() {
        let (mut state, rx) = dialog_state(DialogKind::Input);
        handle_dialog_key(&mut state, KeyCode::Char('x'));
        handle_dialog_key(&mut state, KeyCode::Esc);
        assert_eq!(rx.await.unwrap(), DialogReply::Dismissed);
    }

    #[test]
    fn unrelated_keys_leave_a_confirm_dialog_open() {
        let (mut state, _rx) = dialog_state(DialogKind::Confirm);
        handle_dialog_key(&mut state, KeyCode::Char('x'));
        handle_dialog_key(&mut state, KeyCode::Enter);
        assert!(state.dialog.is_some());
    }

    #[test]
    fn finished_events_reconcile_the_running_state() {
        let mut state = UiState::default();
        apply_event(
            &mut state,
            SurfaceEvent::ToolStarted {
                tool: ToolKind::Cleanup,
            },
        );
        assert_eq!(state.running, Some(ToolKind::Cleanup));

        apply_event(
            &mut state,
            SurfaceEvent::ToolFinished {
                tool: ToolKind::Cleanup,
                state: RunState::Completed,
            },
        );
        assert_eq!(state.running, None);
        assert_eq!(
            state.last_finished,
            Some((ToolKind::Cleanup, RunState::Completed))
        );
    }

    #[test]
    fn popup_rect_stays_inside_the_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(area, 60, 7);
        assert!(popup.x + popup.width <= area.width);
        assert!(popup.y + popup.height <= area.height);

        let tiny = Rect::new(0, 0, 10, 3);
        let popup = centered_rect(tiny, 60, 7);
        assert!(popup.width <= tiny.width);
        assert!(popup.height <= tiny.height);
    }
}
