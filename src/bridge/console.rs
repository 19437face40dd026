//! Blocking console implementation of the Bridge.
//!
//! Output goes through a dedicated blocking writer task so the async side
//! never stalls on a slow terminal. Input comes from a single detached
//! stdin reader thread feeding a channel: a timed-out `read_line` simply
//! abandons the pending read, and the reader thread stays parked on
//! stdin until the next real line arrives. That parked thread (and the
//! line it eventually swallows) is the documented cost of putting a
//! timeout on an uncancellable blocking read.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::warn;

use super::{Bridge, ReadOutcome};

/// Spawn the blocking stdout writer task.
fn spawn_output_writer() -> UnboundedSender<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = std::io::LineWriter::new(stdout.lock());
        while let Some(line) = rx.blocking_recv() {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    });
    tx
}

/// Spawn the detached stdin reader thread. Runs for the life of the
/// process; lines typed after a timed-out prompt are consumed by the
/// next read.
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(line.trim_end().to_string()).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(%err, "stdin read failed");
                        break;
                    }
                }
            }
        })
        .expect("spawn stdin reader thread");
    rx
}

/// Read one keypress in raw mode. Blocking; meant for `spawn_blocking`.
pub(crate) fn read_key_blocking() -> Option<KeyCode> {
    let raw = terminal::enable_raw_mode().is_ok();
    let code = loop {
        match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => break Some(k.code),
            Ok(_) => continue,
            Err(_) => break None,
        }
    };
    if raw {
        let _ = terminal::disable_raw_mode();
    }
    code
}

pub struct ConsoleBridge {
    out_tx: UnboundedSender<String>,
    lines: Mutex<UnboundedReceiver<String>>,
}

impl ConsoleBridge {
    pub fn new() -> Self {
        Self {
            out_tx: spawn_output_writer(),
            lines: Mutex::new(spawn_stdin_reader()),
        }
    }

    /// Test constructor with injected input and captured output.
    #[cfg(test)]
    pub(crate) fn from_parts(
        out_tx: UnboundedSender<String>,
        lines: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            out_tx,
            lines: Mutex::new(lines),
        }
    }
}

impl Default for ConsoleBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bridge for ConsoleBridge {
    fn emit(&self, text: &str) {
        let _ = self.out_tx.send(text.to_string());
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.emit(prompt);
        tokio::task::spawn_blocking(read_key_blocking)
            .await
            .ok()
            .flatten()
            .is_some_and(|code| matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')))
    }

    async fn read_line(&self, prompt: &str, limit: Duration) -> ReadOutcome {
        self.emit(prompt);
        let mut lines = self.lines.lock().await;
        match tokio::time::timeout(limit, lines.recv()).await {
            Ok(Some(line)) => ReadOutcome::Line(line),
            // Closed stdin reads as a cancelled prompt.
            Ok(None) => ReadOutcome::TimedOut,
            Err(_) => ReadOutcome::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn scripted(input: &[&str]) -> (ConsoleBridge, UnboundedReceiver<String>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        for line in input {
            in_tx.send(line.to_string()).unwrap();
        }
        drop(in_tx);
        (ConsoleBridge::from_parts(out_tx, in_rx), out_rx)
    }

    #[tokio::test]
    async fn read_line_returns_a_pending_line() {
        let (bridge, _out) = scripted(&["C:"]);
        let got = bridge.read_line("drive?", Duration::from_secs(1)).await;
        assert_eq!(got, ReadOutcome::Line("C:".into()));
    }

    #[tokio::test]
    async fn read_line_times_out_without_input() {
        let (out_tx, _out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();
        let bridge = ConsoleBridge::from_parts(out_tx, in_rx);

        let started = Instant::now();
        let got = bridge.read_line("path?", Duration::from_millis(100)).await;
        assert_eq!(got, ReadOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(in_tx);
    }

    #[tokio::test]
    async fn closed_stdin_reads_as_cancelled() {
        let (bridge, _out) = scripted(&[]);
        let got = bridge.read_line("path?", Duration::from_secs(1)).await;
        assert_eq!(got, ReadOutcome::TimedOut);
    }

    #[tokio::test]
    async fn emit_reaches_the_writer_channel() {
        let (bridge, mut out) = scripted(&[]);
        bridge.emit("hello");
        assert_eq!(out.recv().await.unwrap(), "hello");
    }
}
