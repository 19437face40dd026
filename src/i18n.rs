//! Language collaborator.
//!
//! A `Translator` value is constructed once at startup from settings and
//! passed to every consumer; there is no global language state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    English,
    Chinese,
}

impl Locale {
    pub fn code(self) -> &'static str {
        match self {
            Locale::English => "en",
            Locale::Chinese => "zh",
        }
    }

    /// Best-effort detection from the POSIX locale environment. Anything
    /// that is not recognizably Chinese falls back to English.
    pub fn from_system() -> Self {
        let raw = std::env::var("LC_ALL")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_default();
        if raw.to_ascii_lowercase().starts_with("zh") {
            Locale::Chinese
        } else {
            Locale::English
        }
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Locale::English),
            "zh" | "chinese" => Ok(Locale::Chinese),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown locale {0:?}, expected \"en\" or \"zh\"")]
pub struct UnknownLocale(String);

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Closed key set for every user-visible string in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Msg {
    // Application chrome
    AppTitle,
    MenuHeading,
    MenuPrompt,
    MenuExitHint,
    InvalidChoice,
    HelpTitle,
    HelpInputNumber,
    HelpEscExit,
    PressAnyKey,
    PleaseWait,
    OperationCancelled,
    OperationComplete,
    OperationFailed,
    AlreadyRunning,
    ConfirmSuffix,
    InputTimedOut,

    // Menu labels
    ToolSfc,
    ToolDism,
    ToolDismAuto,
    ToolDiskCheckOne,
    ToolDiskCheckAll,
    ToolBootRepair,
    ToolNetworkReset,
    ToolGpuInfo,
    ToolGpuMonitor,
    ToolCleanup,
    ToolQuickScan,
    ToolFullScan,
    ToolCustomScan,
    ToolUpdateDefs,

    // Failure taxonomy
    FailTimeout,
    FailTimeoutNote,
    FailToolMissing,
    FailPermission,
    FailPermissionHint,
    FailNonZero,
    FailUnexpected,

    // System file checker
    SfcRunning,
    SfcNoViolations,
    SfcViolationsFound,
    SfcRepairPrompt,

    // DISM
    DismRepairRunning,
    DismRepairComplete,
    DismScanRunning,
    DismScanComplete,
    DismNoCorruption,
    DismCorruptionFound,

    // Disk check
    DiskEnterDrive,
    DiskReadonlyPrompt,
    DiskChecking,
    DiskCheckComplete,
    DiskNoDrives,
    DiskCheckAllConfirm,

    // Boot repair
    BootChoices,
    BootEnterAction,
    BootInvalidAction,
    BootComplete,

    // Network reset
    NetworkResetWarning,
    NetworkResetConfirm,
    NetworkResetComplete,
    RestartRequired,

    // GPU
    GpuQuerying,
    GpuAdapterHeading,
    GpuAdapterLimited,
    GpuNotFound,
    GpuMonitorStarted,
    GpuMonitorStopped,
    MonitorStopHint,

    // Cleanup
    CleanupStarting,
    RecycleBinCleaned,
    RecycleBinFailed,
    CleaningTemp,
    CleaningLogs,
    CleanupRemoved,
    CleanupRemoveFailed,
    CleanupBudget,
    CleanupComplete,

    // Malware scan
    ScanMenuTitle,
    ScanStartingQuick,
    ScanStartingFull,
    FullScanWarning,
    ScanStartingCustom,
    CustomScanEnterPath,
    CustomScanInvalidPath,
    ScanComplete,
    UpdatingDefinitions,
    DefinitionsUpdated,
    ThreatsDetected,
    NoThreatsDetected,
    RemoveThreatsPrompt,
    RemovingThreats,
    ThreatsRemoved,

    // TUI chrome
    TuiMenuTitle,
    TuiOutputTitle,
    TuiKeysHint,
    TuiStatusIdle,
    TuiStatusRunning,
    TuiCancelHint,
    TuiDialogYesNo,
    TuiDialogInputHint,
}

#[derive(Debug, Clone, Copy)]
pub struct Translator {
    locale: Locale,
}

impl Translator {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn text(&self, msg: Msg) -> &'static str {
        match self.locale {
            Locale::English => english(msg),
            Locale::Chinese => chinese(msg),
        }
    }
}

fn english(msg: Msg) -> &'static str {
    use Msg::*;
    match msg {
        AppTitle => "winmaint — Windows maintenance toolkit",
        MenuHeading => "Select a maintenance operation:",
        MenuPrompt => "Enter a number, h for help, Esc to exit",
        MenuExitHint => "Esc — exit",
        InvalidChoice => "Invalid choice.",
        HelpTitle => "Help",
        HelpInputNumber => "Type the number of an operation to run it.",
        HelpEscExit => "Press Esc at the menu to exit the program.",
        PressAnyKey => "Press any key to continue...",
        PleaseWait => "This can take a while, please wait...",
        OperationCancelled => "Operation cancelled.",
        OperationComplete => "Operation complete.",
        OperationFailed => "Operation failed",
        AlreadyRunning => "Another operation is still running; wait for it to finish.",
        ConfirmSuffix => "[y/N]",
        InputTimedOut => "No input received in time; the operation was skipped.",

        ToolSfc => "System file check (sfc /scannow)",
        ToolDism => "Repair system image (DISM RestoreHealth)",
        ToolDismAuto => "Scan and auto-repair system image (DISM)",
        ToolDiskCheckOne => "Check a single drive (chkdsk)",
        ToolDiskCheckAll => "Check all drives (chkdsk)",
        ToolBootRepair => "Boot repair (bootrec)",
        ToolNetworkReset => "Reset network stack (netsh winsock reset)",
        ToolGpuInfo => "Show GPU information",
        ToolGpuMonitor => "Monitor GPU continuously",
        ToolCleanup => "Clean up recycle bin and temp files",
        ToolQuickScan => "Quick malware scan",
        ToolFullScan => "Full malware scan",
        ToolCustomScan => "Scan a custom path",
        ToolUpdateDefs => "Update malware definitions",

        FailTimeout => "The command did not finish within its time limit.",
        FailTimeoutNote => {
            "Termination was requested; the command may still be running in the background."
        }
        FailToolMissing => "The required system tool was not found on this machine.",
        FailPermission => "Permission was denied while running the command.",
        FailPermissionHint => "Re-run this program from an elevated (administrator) session.",
        FailNonZero => "The command reported an error",
        FailUnexpected => "An unexpected error occurred",

        SfcRunning => "Running the system file checker (sfc /scannow)...",
        SfcNoViolations => "No integrity violations were found.",
        SfcViolationsFound => "The system file checker found and processed integrity violations.",
        SfcRepairPrompt => "Run a DISM image repair to fix remaining corruption?",

        DismRepairRunning => "Repairing the system image (DISM /RestoreHealth)...",
        DismRepairComplete => "System image repair complete.",
        DismScanRunning => "Scanning the system image for corruption...",
        DismScanComplete => "System image health scan complete.",
        DismNoCorruption => "No component store corruption detected.",
        DismCorruptionFound => "Component store corruption detected; starting repair.",

        DiskEnterDrive => "Enter the drive letter to check (for example C):",
        DiskReadonlyPrompt => "Check in read-only mode? (no = repair mode /f)",
        DiskChecking => "Checking drive",
        DiskCheckComplete => "Disk check complete.",
        DiskNoDrives => "No drives detected.",
        DiskCheckAllConfirm => "Check every detected drive in sequence?",

        BootChoices => "Boot repair actions: /fixmbr, /fixboot, /scanos, /rebuildbcd",
        BootEnterAction => "Enter the bootrec action to run (empty to cancel):",
        BootInvalidAction => "Unknown bootrec action.",
        BootComplete => "Boot repair command finished.",

        NetworkResetWarning => {
            "Resetting the network stack will drop all current connections and requires a restart."
        }
        NetworkResetConfirm => "Reset the network stack now?",
        NetworkResetComplete => "Network reset completed.",
        RestartRequired => "Restart the computer to finish applying the change.",

        GpuQuerying => "Querying GPU state...",
        GpuAdapterHeading => "Detected display adapters:",
        GpuAdapterLimited => "(limited information; vendor tool not available)",
        GpuNotFound => "No display adapter information found.",
        GpuMonitorStarted => "Continuous GPU monitoring started.",
        GpuMonitorStopped => "Continuous GPU monitoring stopped.",
        MonitorStopHint => "Press any key to stop monitoring.",

        CleanupStarting => "Starting system cleanup...",
        RecycleBinCleaned => "Recycle bin emptied.",
        RecycleBinFailed => "Could not empty the recycle bin",
        CleaningTemp => "Cleaning the temporary directory...",
        CleaningLogs => "Removing stray log files...",
        CleanupRemoved => "Removed",
        CleanupRemoveFailed => "Could not remove",
        CleanupBudget => "Cleanup time budget exceeded; remaining entries were skipped.",
        CleanupComplete => "Cleanup finished",

        ScanMenuTitle => "Malware scan (Windows Defender)",
        ScanStartingQuick => "Starting a quick malware scan (several minutes)...",
        ScanStartingFull => "Starting a full malware scan...",
        FullScanWarning => "A full scan can take hours and slows the machine down while running.",
        ScanStartingCustom => "Starting a custom path scan...",
        CustomScanEnterPath => "Enter the path to scan (empty to cancel):",
        CustomScanInvalidPath => "The path does not exist or cannot be scanned.",
        ScanComplete => "Scan complete.",
        UpdatingDefinitions => "Updating malware definitions...",
        DefinitionsUpdated => "Malware definitions are up to date.",
        ThreatsDetected => "Threats were detected:",
        NoThreatsDetected => "No threats detected.",
        RemoveThreatsPrompt => "Remove the detected threats now?",
        RemovingThreats => "Removing detected threats...",
        ThreatsRemoved => "Detected threats were removed.",

        TuiMenuTitle => "Operations",
        TuiOutputTitle => "Output",
        TuiKeysHint => "↑/↓ select · Enter run · c cancel monitor · q quit",
        TuiStatusIdle => "Idle",
        TuiStatusRunning => "Running:",
        TuiCancelHint => "press c to stop",
        TuiDialogYesNo => "y — yes · n/Esc — no",
        TuiDialogInputHint => "Enter — confirm · Esc — cancel",
    }
}

fn chinese(msg: Msg) -> &'static str {
    use Msg::*;
    match msg {
        AppTitle => "winmaint — Windows 维护工具箱",
        MenuHeading => "请选择维护操作：",
        MenuPrompt => "输入编号运行，h 查看帮助，Esc 退出",
        MenuExitHint => "Esc — 退出",
        InvalidChoice => "无效的选择。",
        HelpTitle => "帮助",
        HelpInputNumber => "输入操作编号即可运行对应操作。",
        HelpEscExit => "在菜单界面按 Esc 退出程序。",
        PressAnyKey => "按任意键继续...",
        PleaseWait => "该操作可能耗时较长，请耐心等待...",
        OperationCancelled => "操作已取消。",
        OperationComplete => "操作完成。",
        OperationFailed => "操作失败",
        AlreadyRunning => "另一个操作仍在运行，请等待其结束。",
        ConfirmSuffix => "[y/N]",
        InputTimedOut => "等待输入超时，已跳过该操作。",

        ToolSfc => "系统文件检查 (sfc /scannow)",
        ToolDism => "修复系统映像 (DISM RestoreHealth)",
        ToolDismAuto => "扫描并自动修复系统映像 (DISM)",
        ToolDiskCheckOne => "检查单个驱动器 (chkdsk)",
        ToolDiskCheckAll => "检查所有驱动器 (chkdsk)",
        ToolBootRepair => "引导修复 (bootrec)",
        ToolNetworkReset => "重置网络 (netsh winsock reset)",
        ToolGpuInfo => "显示 GPU 信息",
        ToolGpuMonitor => "持续监控 GPU",
        ToolCleanup => "清理回收站和临时文件",
        ToolQuickScan => "快速病毒扫描",
        ToolFullScan => "完整病毒扫描",
        ToolCustomScan => "扫描自定义路径",
        ToolUpdateDefs => "更新病毒定义",

        FailTimeout => "命令未在限定时间内完成。",
        FailTimeoutNote => "已请求终止该命令；它可能仍在后台运行。",
        FailToolMissing => "本机未找到所需的系统工具。",
        FailPermission => "运行命令时权限被拒绝。",
        FailPermissionHint => "请以管理员身份重新运行本程序。",
        FailNonZero => "命令报告了错误",
        FailUnexpected => "发生意外错误",

        SfcRunning => "正在运行系统文件检查器 (sfc /scannow)...",
        SfcNoViolations => "未发现完整性冲突。",
        SfcViolationsFound => "系统文件检查器发现并处理了完整性冲突。",
        SfcRepairPrompt => "是否运行 DISM 映像修复以处理剩余损坏？",

        DismRepairRunning => "正在修复系统映像 (DISM /RestoreHealth)...",
        DismRepairComplete => "系统映像修复完成。",
        DismScanRunning => "正在扫描系统映像损坏情况...",
        DismScanComplete => "系统映像健康扫描完成。",
        DismNoCorruption => "未检测到组件存储损坏。",
        DismCorruptionFound => "检测到组件存储损坏，开始修复。",

        DiskEnterDrive => "请输入要检查的驱动器盘符（例如 C）：",
        DiskReadonlyPrompt => "以只读模式检查？（否 = 修复模式 /f）",
        DiskChecking => "正在检查驱动器",
        DiskCheckComplete => "磁盘检查完成。",
        DiskNoDrives => "未检测到驱动器。",
        DiskCheckAllConfirm => "依次检查所有检测到的驱动器？",

        BootChoices => "引导修复操作：/fixmbr、/fixboot、/scanos、/rebuildbcd",
        BootEnterAction => "请输入要执行的 bootrec 操作（留空取消）：",
        BootInvalidAction => "未知的 bootrec 操作。",
        BootComplete => "引导修复命令已完成。",

        NetworkResetWarning => "重置网络将断开当前所有连接，并且需要重启计算机。",
        NetworkResetConfirm => "现在重置网络吗？",
        NetworkResetComplete => "网络重置完成。",
        RestartRequired => "请重启计算机以完成更改。",

        GpuQuerying => "正在查询 GPU 状态...",
        GpuAdapterHeading => "检测到的显示适配器：",
        GpuAdapterLimited => "（信息有限，未找到厂商工具）",
        GpuNotFound => "未找到显示适配器信息。",
        GpuMonitorStarted => "已开始持续监控 GPU。",
        GpuMonitorStopped => "已停止持续监控 GPU。",
        MonitorStopHint => "按任意键停止监控。",

        CleanupStarting => "开始系统清理...",
        RecycleBinCleaned => "回收站已清空。",
        RecycleBinFailed => "无法清空回收站",
        CleaningTemp => "正在清理临时目录...",
        CleaningLogs => "正在删除多余的日志文件...",
        CleanupRemoved => "已删除",
        CleanupRemoveFailed => "无法删除",
        CleanupBudget => "清理时间预算已用完，剩余条目被跳过。",
        CleanupComplete => "清理结束",

        ScanMenuTitle => "病毒扫描（Windows Defender）",
        ScanStartingQuick => "开始快速病毒扫描（需要几分钟）...",
        ScanStartingFull => "开始完整病毒扫描...",
        FullScanWarning => "完整扫描可能持续数小时，期间机器会变慢。",
        ScanStartingCustom => "开始自定义路径扫描...",
        CustomScanEnterPath => "请输入要扫描的路径（留空取消）：",
        CustomScanInvalidPath => "该路径不存在或无法扫描。",
        ScanComplete => "扫描完成。",
        UpdatingDefinitions => "正在更新病毒定义...",
        DefinitionsUpdated => "病毒定义已是最新。",
        ThreatsDetected => "检测到威胁：",
        NoThreatsDetected => "未检测到威胁。",
        RemoveThreatsPrompt => "现在移除检测到的威胁吗？",
        RemovingThreats => "正在移除检测到的威胁...",
        ThreatsRemoved => "检测到的威胁已移除。",

        TuiMenuTitle => "操作",
        TuiOutputTitle => "输出",
        TuiKeysHint => "↑/↓ 选择 · Enter 运行 · c 取消监控 · q 退出",
        TuiStatusIdle => "空闲",
        TuiStatusRunning => "运行中：",
        TuiCancelHint => "按 c 停止",
        TuiDialogYesNo => "y — 是 · n/Esc — 否",
        TuiDialogInputHint => "Enter — 确认 · Esc — 取消",
    }
}
