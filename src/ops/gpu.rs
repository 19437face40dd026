//! GPU query operations: one-shot vendor query with a generic fallback,
//! and a continuous monitor loop with cooperative cancellation.

use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

use super::OpCtx;
use crate::i18n::Msg;
use crate::model::{FailureKind, ToolRequest};

pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(1);

const WMIC_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn show_gpu_info(ctx: &OpCtx<'_>) -> Result<()> {
    query_once(ctx).await;
    Ok(())
}

/// One vendor-tool query. Returns whether the monitor loop should keep
/// polling: a non-zero exit means no vendor tool, so we render the
/// generic adapter list once and stop.
pub(crate) async fn query_once(ctx: &OpCtx<'_>) -> bool {
    ctx.say(Msg::GpuQuerying);
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ["cmd.exe", "/c", "nvidia-smi"],
            ctx.timeouts.gpu_info,
        ))
        .await;
    match outcome.failure {
        None => {
            let text = outcome.stdout.trim_end();
            if !text.is_empty() {
                ctx.bridge.emit(text);
            }
            true
        }
        Some(FailureKind::NonZeroExit) => {
            fallback_adapter_list(ctx).await;
            false
        }
        Some(_) => {
            ctx.report_failure(&outcome);
            false
        }
    }
}

/// Generic adapter listing for machines without the vendor tool.
async fn fallback_adapter_list(ctx: &OpCtx<'_>) {
    info!("vendor GPU tool unavailable, falling back to adapter listing");
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ["wmic", "path", "win32_VideoController", "get", "name"],
            WMIC_TIMEOUT,
        ))
        .await;
    if !outcome.succeeded() {
        ctx.report_failure(&outcome);
        return;
    }

    let adapters: Vec<&str> = outcome
        .stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if adapters.is_empty() {
        ctx.say(Msg::GpuNotFound);
        return;
    }
    ctx.say(Msg::GpuAdapterHeading);
    for adapter in adapters {
        ctx.bridge
            .emit(&format!("- {adapter} {}", ctx.tr.text(Msg::GpuAdapterLimited)));
    }
}

/// Continuous monitor. The cancel flag is checked between poll
/// iterations, so a cancellation lands within one interval.
pub async fn monitor(ctx: &OpCtx<'_>, cancel: &AtomicBool, interval: Duration) -> Result<()> {
    info!("starting continuous GPU monitor");
    ctx.say(Msg::GpuMonitorStarted);
    poll_until_cancelled(cancel, interval, move || query_once(ctx)).await;
    ctx.say(Msg::GpuMonitorStopped);
    Ok(())
}

/// Drive a poll step until the flag is raised or the step declines to
/// continue.
pub(crate) async fn poll_until_cancelled<F, Fut>(cancel: &AtomicBool, interval: Duration, mut step: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    loop {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if !step().await {
            break;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[tokio::test]
    async fn cancellation_lands_within_one_poll_interval() {
        let cancel = Arc::new(AtomicBool::new(false));
        let interval = Duration::from_millis(100);

        let flag = cancel.clone();
        let worker = tokio::spawn(async move {
            let started = Instant::now();
            poll_until_cancelled(&flag, interval, || async { true }).await;
            started.elapsed()
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        cancel.store(true, Ordering::Relaxed);
        let elapsed = worker.await.unwrap();

        // 1.5 poll intervals after the flag was raised, with scheduling slack.
        assert!(elapsed < Duration::from_millis(400), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn a_declining_step_stops_the_loop() {
        let cancel = AtomicBool::new(false);
        let mut calls = 0u32;
        poll_until_cancelled(&cancel, Duration::from_millis(10), || {
            calls += 1;
            async move { false }
        })
        .await;
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn a_pre_raised_flag_prevents_any_polling() {
        let cancel = AtomicBool::new(true);
        let mut calls = 0u32;
        poll_until_cancelled(&cancel, Duration::from_millis(10), || {
            calls += 1;
            async move { true }
        })
        .await;
        assert_eq!(calls, 0);
    }
}
