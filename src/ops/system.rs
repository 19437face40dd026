//! System repair operations: file checker, DISM image repair, disk
//! check, boot repair and network stack reset.

use anyhow::Result;
use std::time::Duration;
use tracing::info;

use super::{mentions, OpCtx};
use crate::bridge::ReadOutcome;
use crate::i18n::Msg;
use crate::model::ToolRequest;

/// Output markers for a clean sfc run, in the locales the tool ships in.
const SFC_CLEAN_MARKERS: &[&str] = &[
    "did not find any integrity violations",
    "未找到任何完整性冲突",
];

/// Output markers for a clean DISM CheckHealth result.
const DISM_CLEAN_MARKERS: &[&str] = &[
    "no component store corruption detected",
    "未检测到组件存储损坏",
];

const BOOTREC_ACTIONS: &[&str] = &["/fixmbr", "/fixboot", "/scanos", "/rebuildbcd"];

/// Pause between drives in the all-drives sweep so the operator can read
/// each result.
const DRIVE_SWEEP_PAUSE: Duration = Duration::from_secs(5);

const DRIVE_LIST_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn sfc_scan(ctx: &OpCtx<'_>) -> Result<()> {
    info!("running system file checker");
    ctx.say(Msg::SfcRunning);
    ctx.say(Msg::PleaseWait);

    let outcome = ctx
        .runner
        .run(&ToolRequest::new(["sfc", "/scannow"], ctx.timeouts.sfc))
        .await;
    if !outcome.succeeded() {
        ctx.report_failure(&outcome);
        return Ok(());
    }

    if mentions(&outcome.stdout, SFC_CLEAN_MARKERS) {
        ctx.say(Msg::SfcNoViolations);
        return Ok(());
    }

    ctx.say(Msg::SfcViolationsFound);
    if ctx.confirm_msg(Msg::SfcRepairPrompt).await {
        dism_restore(ctx).await?;
    } else {
        ctx.say(Msg::OperationCancelled);
    }
    Ok(())
}

pub async fn dism_restore(ctx: &OpCtx<'_>) -> Result<()> {
    info!("running DISM RestoreHealth");
    ctx.say(Msg::DismRepairRunning);
    ctx.say(Msg::PleaseWait);

    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ["DISM.exe", "/Online", "/Cleanup-Image", "/RestoreHealth"],
            ctx.timeouts.dism,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::DismRepairComplete);
    } else {
        ctx.report_failure(&outcome);
    }
    Ok(())
}

/// Scan the image, check the verdict, and repair only when the check
/// reports component-store corruption.
pub async fn dism_auto_repair(ctx: &OpCtx<'_>) -> Result<()> {
    info!("running DISM auto repair chain");
    ctx.say(Msg::DismScanRunning);
    let scan = ctx
        .runner
        .run(&ToolRequest::new(
            ["DISM.exe", "/Online", "/Cleanup-Image", "/ScanHealth"],
            ctx.timeouts.dism,
        ))
        .await;
    if !scan.succeeded() {
        ctx.report_failure(&scan);
        return Ok(());
    }
    ctx.say(Msg::DismScanComplete);

    let check = ctx
        .runner
        .run(&ToolRequest::new(
            ["DISM.exe", "/Online", "/Cleanup-Image", "/CheckHealth"],
            ctx.timeouts.dism,
        ))
        .await;
    if !check.succeeded() {
        ctx.report_failure(&check);
        return Ok(());
    }

    if mentions(&check.stdout, DISM_CLEAN_MARKERS) {
        ctx.say(Msg::DismNoCorruption);
    } else {
        ctx.say(Msg::DismCorruptionFound);
        dism_restore(ctx).await?;
    }
    Ok(())
}

pub async fn check_single_drive(ctx: &OpCtx<'_>) -> Result<()> {
    let raw = match ctx
        .bridge
        .read_line(ctx.tr.text(Msg::DiskEnterDrive), ctx.timeouts.user_input)
        .await
    {
        ReadOutcome::Line(line) => line,
        ReadOutcome::TimedOut => {
            ctx.say(Msg::InputTimedOut);
            return Ok(());
        }
    };
    if raw.trim().is_empty() {
        ctx.say(Msg::OperationCancelled);
        return Ok(());
    }
    let Some(drive) = normalize_drive(&raw) else {
        ctx.say(Msg::InvalidChoice);
        return Ok(());
    };

    let readonly = ctx.confirm_msg(Msg::DiskReadonlyPrompt).await;
    chkdsk(ctx, &drive, readonly).await
}

pub async fn check_all_drives(ctx: &OpCtx<'_>) -> Result<()> {
    if !ctx.confirm_msg(Msg::DiskCheckAllConfirm).await {
        ctx.say(Msg::OperationCancelled);
        return Ok(());
    }

    let drives = list_drives(ctx).await;
    if drives.is_empty() {
        ctx.say(Msg::DiskNoDrives);
        return Ok(());
    }

    for (idx, drive) in drives.iter().enumerate() {
        let readonly = ctx.confirm_msg(Msg::DiskReadonlyPrompt).await;
        chkdsk(ctx, drive, readonly).await?;
        if idx + 1 < drives.len() {
            tokio::time::sleep(DRIVE_SWEEP_PAUSE).await;
        }
    }
    Ok(())
}

async fn chkdsk(ctx: &OpCtx<'_>, drive: &str, readonly: bool) -> Result<()> {
    info!(drive, readonly, "running disk check");
    ctx.bridge
        .emit(&format!("{} {drive}...", ctx.tr.text(Msg::DiskChecking)));

    let mut command = vec!["chkdsk".to_string(), drive.to_string()];
    if !readonly {
        command.push("/f".to_string());
    }
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(command, ctx.timeouts.chkdsk))
        .await;
    if outcome.succeeded() {
        let text = outcome.stdout.trim_end();
        if !text.is_empty() {
            ctx.bridge.emit(text);
        }
        ctx.say(Msg::DiskCheckComplete);
    } else {
        ctx.report_failure(&outcome);
    }
    Ok(())
}

/// Enumerate logical drives through the Runner. A missing enumeration
/// tool degrades to "no drives detected" instead of failing the tool.
async fn list_drives(ctx: &OpCtx<'_>) -> Vec<String> {
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ["wmic", "logicaldisk", "get", "name"],
            DRIVE_LIST_TIMEOUT,
        ))
        .await;
    if !outcome.succeeded() {
        ctx.report_failure(&outcome);
        return Vec::new();
    }
    parse_drive_list(&outcome.stdout)
}

fn parse_drive_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| {
            let bytes = line.as_bytes();
            bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
        })
        .map(|line| line.to_ascii_uppercase())
        .collect()
}

fn normalize_drive(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches(['\\', '/', ':']);
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            Some(format!("{}:", letter.to_ascii_uppercase()))
        }
        _ => None,
    }
}

pub async fn boot_repair(ctx: &OpCtx<'_>) -> Result<()> {
    ctx.say(Msg::BootChoices);
    let action = match ctx
        .bridge
        .read_line(ctx.tr.text(Msg::BootEnterAction), ctx.timeouts.user_input)
        .await
    {
        ReadOutcome::Line(line) => line.trim().to_ascii_lowercase(),
        ReadOutcome::TimedOut => {
            ctx.say(Msg::InputTimedOut);
            return Ok(());
        }
    };
    if action.is_empty() {
        ctx.say(Msg::OperationCancelled);
        return Ok(());
    }
    if !BOOTREC_ACTIONS.contains(&action.as_str()) {
        ctx.say(Msg::BootInvalidAction);
        return Ok(());
    }

    info!(action, "running boot repair");
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            vec!["bootrec".to_string(), action],
            ctx.timeouts.bootrec,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::BootComplete);
    } else {
        ctx.report_failure(&outcome);
    }
    Ok(())
}

pub async fn network_reset(ctx: &OpCtx<'_>) -> Result<()> {
    ctx.say(Msg::NetworkResetWarning);
    if !ctx.confirm_msg(Msg::NetworkResetConfirm).await {
        info!("network reset declined");
        ctx.say(Msg::OperationCancelled);
        return Ok(());
    }

    info!("resetting the network stack");
    let outcome = ctx
        .runner
        .run(&ToolRequest::new(
            ["netsh", "winsock", "reset"],
            ctx.timeouts.netsh,
        ))
        .await;
    if outcome.succeeded() {
        ctx.say(Msg::NetworkResetComplete);
        ctx.say(Msg::RestartRequired);
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

    #[test]
    fn drive_letters_normalize() {
        assert_eq!(normalize_drive("c"), Some("C:".into()));
        assert_eq!(normalize_drive(" d: "), Some("D:".into()));
        assert_eq!(normalize_drive("E:\\"), Some("E:".into()));
        assert_eq!(normalize_drive("sda"), None);
        assert_eq!(normalize_drive(""), None);
        assert_eq!(normalize_drive("1:"), None);
    }

    #[test]
    fn drive_list_parses_wmic_output() {
        let out = "Name  \r\nC:  \r\nD:  \r\n\r\n";
        assert_eq!(parse_drive_list(out), vec!["C:", "D:"]);
        assert!(parse_drive_list("Name\n\n").is_empty());
    }

    #[tokio::test]
    async fn declined_network_reset_runs_nothing() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_confirms(&[false]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        network_reset(&ctx).await.unwrap();

        assert!(bridge.emitted_contains("cancelled"));
        // The non-destructive branch: no runner failure was ever reported.
        assert!(!bridge.emitted_contains("not found"));
        assert!(!bridge.emitted_contains("completed"));
    }

    #[tokio::test]
    async fn unknown_bootrec_action_is_rejected_without_running() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_lines(&[ReadOutcome::Line("/format-everything".into())]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        boot_repair(&ctx).await.unwrap();

        assert!(bridge.emitted_contains("Unknown bootrec action"));
        assert!(!bridge.emitted_contains("finished"));
    }

    #[tokio::test]
    async fn timed_out_drive_prompt_skips_the_check() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_lines(&[ReadOutcome::TimedOut]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        check_single_drive(&ctx).await.unwrap();

        assert!(bridge.emitted_contains("No input received"));
        assert!(!bridge.emitted_contains("Checking drive"));
    }

    #[tokio::test]
    async fn empty_boot_action_cancels() {
        let runner = Runner::new();
        let bridge = ScriptedBridge::with_lines(&[ReadOutcome::Line("  ".into())]);
        let tr = Translator::new(Locale::English);
        let timeouts = Timeouts::default();
        let ctx = test_ctx(&runner, &bridge, &tr, &timeouts);

        boot_repair(&ctx).await.unwrap();
        assert!(bridge.emitted_contains("cancelled"));
    }
}
