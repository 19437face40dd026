//! Malware scan operations over the Windows Defender PowerShell surface:
//! quick/full/custom scans, definition updates, and the threat
//! review/removal confirmation flow.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::{ps_command, OpCtx};
use crate::bridge::ReadOutcome;
use crate::i18n::Msg;
use crate::model::{ToolRequest, ProcessOutcome};
use std::time::Duration;

pub async fn quick_scan(ctx: &OpCtx<'_>) -> Result<()> {
    info!("starting quick malware scan");
    ctx.say(Msg::ScanStartingQuick);
    let outcome = start_scan(ctx, "Start-MpScan -ScanType QuickScan", ctx.timeouts.quick_scan).await;
    finish_scan(ctx, outcome).await
}

pub async fn full_scan(ctx: &OpCtx<'_>) -> Result<()> {
    info!("starting full malware scan");
    ctx.say(Msg::ScanStartingFull);
    ctx.say(Msg::FullScanWarning);
    let outcome = start_scan(ctx, "Start-MpScan -ScanType FullScan", ctx.timeouts.full_scan).await;
    finish_scan(ctx, outcome).await
}

pub async fn custom_scan(ctx: &OpCtx<'_>) -> Result<()> {
    let path = match ctx
        .bridge
        .read_line(ctx.tr.text(Msg::CustomScanEnterPath), ctx.timeouts.user_input)
        .await
    {
        ReadOutcome::Line(line) => line.trim().to_string(),
        ReadOutcome::TimedOut => {
            ctx.say(Msg::InputTimedOut);
            return Ok(());
        }
    };
    if path.is_empty() {
        ctx.say(Msg::OperationCancelled);
        return Ok(());
    }
    // The path is interpolated into a PowerShell string; refuse anything
    // that could escape the quoting, on top of the existence check.
    if path.contains('"') || path.contains('$') || !Path::new(&path).exists() {
        ctx.say(Msg::CustomScanInvalidPath);
        return Ok(());
    }

    info!(path, "starting custom path scan");
    ctx.say(Msg::ScanStartingCustom);
    let command = format!("Start-MpScan -ScanType CustomScan -ScanPath \"{path}\"");
    let outcome = start_scan(ctx, &command, ctx.timeouts.custom_scan).await;
    finish_scan(ctx, outcome).await
}

pub async fn update_definitions(ctx: &OpCtx<'_>) -> Result<()> {
    info!("updating malware definitions");
    ctx.say(Msg::UpdatingDefinitions);
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ps_command("Update-MpSignature"),
            ctx.timeouts.update_definitions,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::DefinitionsUpdated);
    } else {
        ctx.report_failure(&outcome);
    }
    Ok(())
}

async fn start_scan(ctx: &OpCtx<'_>, command: &str, timeout: Duration) -> ProcessOutcome {
    ctx.say(Msg::PleaseWait);
    ctx.runner
        .run(&ToolRequest::new(ps_command(command), timeout))
        .await
}

async fn finish_scan(ctx: &OpCtx<'_>, outcome: ProcessOutcome) -> Result<()> {
    if !outcome.succeeded() {
        ctx.report_failure(&outcome);
        return Ok(());
    }
    ctx.say(Msg::ScanComplete);
    review_threats(ctx).await
}

/// Fetch the detection report and run the review flow on it.
async fn review_threats(ctx: &OpCtx<'_>) -> Result<()> {
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ps_command("Get-MpThreatDetection"),
            ctx.timeouts.threat_report,
        ))
        .await;
    if !outcome.succeeded() {
        ctx.report_failure(&outcome);
        return Ok(());
    }
    handle_threat_report(ctx, &outcome.stdout).await
}

/// Present a detection report and, only on explicit confirmation, remove
/// the detected threats. Declining takes the non-destructive branch.
pub(crate) async fn handle_threat_report(ctx: &OpCtx<'_>, report: &str) -> Result<()> {
    let report = report.trim();
    if report.is_empty() {
        ctx.say(Msg::NoThreatsDetected);
        return Ok(());
    }

    info!("threats detected");
    ctx.say(Msg::ThreatsDetected);
    ctx.bridge.emit(report);

    if ctx.confirm_msg(Msg::RemoveThreatsPrompt).await {
        remove_threats(ctx).await
    } else {
        info!("threat removal declined");
        ctx.say(Msg::OperationCancelled);
        Ok(())
    }
}

async fn remove_threats(ctx: &OpCtx<'_>) -> Result<()> {
    info!("removing detected threats");
    ctx.say(Msg::RemovingThreats);
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ps_command("Remove-MpThreat"),
            ctx.timeouts.remove_threats,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::ThreatsRemoved);
    } else {
        ctx.report_failure(&outcome);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Locale, Translator};
    use crate::ops::testutil::{test_ctx, ScriptedBridge};
    use crate::runner::Runner;
    use crate::settings::Timeouts;

    #[tokio::test]
    async fn declined_removal_takes_the_non_destructive_branch() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_confirms(&[false]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        handle_threat_report(&ctx, "Trojan:Win32/Sample\n").await.unwrap();

        assert!(bridge.emitted_contains("Threats were detected"));
        assert!(bridge.emitted_contains("cancelled"));
        assert!(!bridge.emitted_contains("Removing detected threats"));
    }

    #[tokio::test]
    async fn empty_report_means_no_threats() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::default();
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        handle_threat_report(&ctx, "  \n").await.unwrap();
        assert!(bridge.emitted_contains("No threats detected"));
    }

    #[tokio::test]
    async fn quoted_scan_paths_are_rejected() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_lines(&[ReadOutcome::Line(
            "C:\\data\"; Remove-Item -Recurse C:\\ #".into(),
        )]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        custom_scan(&ctx).await.unwrap();
        assert!(bridge.emitted_contains("does not exist or cannot be scanned"));
    }

    #[tokio::test]
    async fn empty_scan_path_cancels() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_lines(&[ReadOutcome::Line(String::new())]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        custom_scan(&ctx).await.unwrap();
        assert!(bridge.emitted_contains("cancelled"));
    }
}
