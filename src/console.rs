//! Blocking console session: a numbered menu driven by single
//! keypresses, running each operation to completion before returning to
//! the menu. The same operation bodies run here as in the TUI; only the
//! Bridge implementation differs.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal;
use std::time::Duration;
use tracing::info;

use crate::bridge::console::read_key_blocking;
use crate::bridge::ConsoleBridge;
use crate::i18n::{Msg, Translator};
use crate::model::ToolKind;
use crate::ops::{self, OpCtx};
use crate::runner::Runner;
use crate::settings::Settings;

pub async fn run(settings: &Settings, translator: Translator) -> Result<()> {
    info!("starting console session");
    let runner = Runner::new();
    let bridge = ConsoleBridge::new();
    let ctx = OpCtx {
        runner: &runner,
        bridge: &bridge,
        tr: &translator,
        timeouts: &settings.timeouts,
    };

    loop {
        print_menu(&ctx);
        let Some(key) = read_key().await else { break };
        let tool = match key {
            KeyCode::Esc | KeyCode::Char('q') => break,
            KeyCode::Char('h') => {
                print_help(&ctx);
                wait_for_key(&ctx).await;
                continue;
            }
            KeyCode::Char('1') => Some(ToolKind::SystemFileCheck),
            KeyCode::Char('2') => {
                submenu(&ctx, &[ToolKind::DismAutoRepair, ToolKind::DismRepair]).await
            }
            KeyCode::Char('3') => {
                submenu(&ctx, &[ToolKind::DiskCheckSingle, ToolKind::DiskCheckAll]).await
            }
            KeyCode::Char('4') => Some(ToolKind::BootRepair),
            KeyCode::Char('5') => Some(ToolKind::NetworkReset),
            KeyCode::Char('6') => submenu(&ctx, &[ToolKind::GpuInfo, ToolKind::GpuMonitor]).await,
            KeyCode::Char('7') => Some(ToolKind::Cleanup),
            KeyCode::Char('8') => {
                submenu(
                    &ctx,
                    &[
                        ToolKind::QuickScan,
                        ToolKind::FullScan,
                        ToolKind::CustomScan,
                        ToolKind::UpdateDefinitions,
                    ],
                )
                .await
            }
            _ => {
                ctx.say(Msg::InvalidChoice);
                continue;
            }
        };
        let Some(tool) = tool else { continue };

        // The GPU monitor needs a console-local cancellation loop; every
        // other tool runs through the shared dispatcher.
        if tool == ToolKind::GpuMonitor {
            gpu_monitor_console(&ctx).await?;
        } else {
            let cancel = std::sync::atomic::AtomicBool::new(false);
            ops::run_tool(tool, &ctx, &cancel).await?;
        }
        wait_for_key(&ctx).await;
    }

    info!("console session ended");
    Ok(())
}

fn print_menu(ctx: &OpCtx<'_>) {
    let groups = [
        ctx.tr.text(ToolKind::SystemFileCheck.label()).to_string(),
        format!(
            "{} / {}",
            ctx.tr.text(ToolKind::DismAutoRepair.label()),
            ctx.tr.text(ToolKind::DismRepair.label())
        ),
        format!(
            "{} / {}",
            ctx.tr.text(ToolKind::DiskCheckSingle.label()),
            ctx.tr.text(ToolKind::DiskCheckAll.label())
        ),
        ctx.tr.text(ToolKind::BootRepair.label()).to_string(),
        ctx.tr.text(ToolKind::NetworkReset.label()).to_string(),
        format!(
            "{} / {}",
            ctx.tr.text(ToolKind::GpuInfo.label()),
            ctx.tr.text(ToolKind::GpuMonitor.label())
        ),
        ctx.tr.text(ToolKind::Cleanup.label()).to_string(),
        ctx.tr.text(Msg::ScanMenuTitle).to_string(),
    ];

    ctx.bridge.emit("");
    ctx.say(Msg::AppTitle);
    ctx.say(Msg::MenuHeading);
    for (idx, label) in groups.iter().enumerate() {
        ctx.bridge.emit(&format!("  {}. {label}", idx + 1));
    }
    ctx.say(Msg::MenuPrompt);
}

fn print_help(ctx: &OpCtx<'_>) {
    ctx.say(Msg::HelpTitle);
    ctx.say(Msg::HelpInputNumber);
    ctx.say(Msg::HelpEscExit);
}

/// Render a numbered sub-menu and read one choice. Esc backs out.
async fn submenu(ctx: &OpCtx<'_>, options: &[ToolKind]) -> Option<ToolKind> {
    for (idx, tool) in options.iter().enumerate() {
        ctx.bridge
            .emit(&format!("  {}. {}", idx + 1, ctx.tr.text(tool.label())));
    }
    ctx.say(Msg::MenuExitHint);

    let key = read_key().await?;
    match key {
        KeyCode::Esc => None,
        KeyCode::Char(c) => {
            let choice = c.to_digit(10)? as usize;
            let tool = options.get(choice.checked_sub(1)?).copied();
            if tool.is_none() {
                ctx.say(Msg::InvalidChoice);
            }
            tool
        }
        _ => {
            ctx.say(Msg::InvalidChoice);
            None
        }
    }
}

async fn read_key() -> Option<KeyCode> {
    tokio::task::spawn_blocking(read_key_blocking)
        .await
        .ok()
        .flatten()
}

async fn wait_for_key(ctx: &OpCtx<'_>) {
    ctx.say(Msg::PressAnyKey);
    let _ = read_key().await;
}

/// Console rendition of the continuous monitor: the poll pause doubles
/// as the cancellation window, so any keypress stops the loop within one
/// interval.
async fn gpu_monitor_console(ctx: &OpCtx<'_>) -> Result<()> {
    ctx.say(Msg::GpuMonitorStarted);
    ctx.say(Msg::MonitorStopHint);
    loop {
        if !ops::gpu::query_once(ctx).await {
            break;
        }
        let interval = ops::gpu::POLL_INTERVAL;
        let stopped = tokio::task::spawn_blocking(move || key_within(interval))
            .await
            .unwrap_or(true);
        if stopped {
            break;
        }
    }
    ctx.say(Msg::GpuMonitorStopped);
    Ok(())
}

/// Wait up to `window` for a keypress in raw mode.
fn key_within(window: Duration) -> bool {
    let raw = terminal::enable_raw_mode().is_ok();
    let mut hit = false;
    if event::poll(window).unwrap_or(false) {
        if let Ok(Event::Key(k)) = event::read() {
            hit = k.kind == KeyEventKind::Press;
        }
    }
    if raw {
        let _ = terminal::disable_raw_mode();
    }
    hit
}
