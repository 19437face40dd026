//! Settings collaborator: language choice plus the per-operation timeout
//! table, persisted as JSON under the user config directory. Loaded once
//! at startup and passed down explicitly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::i18n::Locale;

/// Per-operation command timeouts. Serialized with humantime so overrides
/// read naturally ("2h", "30s").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeouts {
    #[serde(default = "d_sfc", with = "humantime_serde")]
    pub sfc: Duration,
    #[serde(default = "d_dism", with = "humantime_serde")]
    pub dism: Duration,
    #[serde(default = "d_chkdsk", with = "humantime_serde")]
    pub chkdsk: Duration,
    #[serde(default = "d_bootrec", with = "humantime_serde")]
    pub bootrec: Duration,
    #[serde(default = "d_netsh", with = "humantime_serde")]
    pub netsh: Duration,
    #[serde(default = "d_gpu_info", with = "humantime_serde")]
    pub gpu_info: Duration,
    #[serde(default = "d_quick_scan", with = "humantime_serde")]
    pub quick_scan: Duration,
    #[serde(default = "d_full_scan", with = "humantime_serde")]
    pub full_scan: Duration,
    #[serde(default = "d_custom_scan", with = "humantime_serde")]
    pub custom_scan: Duration,
    #[serde(default = "d_update_definitions", with = "humantime_serde")]
    pub update_definitions: Duration,
    #[serde(default = "d_threat_report", with = "humantime_serde")]
    pub threat_report: Duration,
    #[serde(default = "d_remove_threats", with = "humantime_serde")]
    pub remove_threats: Duration,
    #[serde(default = "d_cleanup", with = "humantime_serde")]
    pub cleanup: Duration,
    #[serde(default = "d_user_input", with = "humantime_serde")]
    pub user_input: Duration,
}

fn d_sfc() -> Duration {
    Duration::from_secs(3600)
}
fn d_dism() -> Duration {
    Duration::from_secs(3600)
}
fn d_chkdsk() -> Duration {
    Duration::from_secs(1800)
}
fn d_bootrec() -> Duration {
    Duration::from_secs(300)
}
fn d_netsh() -> Duration {
    Duration::from_secs(60)
}
fn d_gpu_info() -> Duration {
    Duration::from_secs(10)
}
fn d_quick_scan() -> Duration {
    Duration::from_secs(600)
}
fn d_full_scan() -> Duration {
    Duration::from_secs(7200)
}
fn d_custom_scan() -> Duration {
    Duration::from_secs(1800)
}
fn d_update_definitions() -> Duration {
    Duration::from_secs(300)
}
fn d_threat_report() -> Duration {
    Duration::from_secs(30)
}
fn d_remove_threats() -> Duration {
    Duration::from_secs(300)
}
fn d_cleanup() -> Duration {
    Duration::from_secs(120)
}
fn d_user_input() -> Duration {
    Duration::from_secs(60)
}

impl Timeouts {
    /// Multiply every timeout by `factor`. Used to shrink the whole table
    /// for tests and CI runs.
    pub fn scaled(&self, factor: f64) -> Result<Self> {
        anyhow::ensure!(
            factor.is_finite() && factor > 0.0,
            "timeout scale must be a positive number, got {factor}"
        );
        let scale = |d: Duration| d.mul_f64(factor);
        Ok(Self {
            sfc: scale(self.sfc),
            dism: scale(self.dism),
            chkdsk: scale(self.chkdsk),
            bootrec: scale(self.bootrec),
            netsh: scale(self.netsh),
            gpu_info: scale(self.gpu_info),
            quick_scan: scale(self.quick_scan),
            full_scan: scale(self.full_scan),
            custom_scan: scale(self.custom_scan),
            update_definitions: scale(self.update_definitions),
            threat_report: scale(self.threat_report),
            remove_threats: scale(self.remove_threats),
            cleanup: scale(self.cleanup),
            user_input: scale(self.user_input),
        })
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            sfc: d_sfc(),
            dism: d_dism(),
            chkdsk: d_chkdsk(),
            bootrec: d_bootrec(),
            netsh: d_netsh(),
            gpu_info: d_gpu_info(),
            quick_scan: d_quick_scan(),
            full_scan: d_full_scan(),
            custom_scan: d_custom_scan(),
            update_definitions: d_update_definitions(),
            threat_report: d_threat_report(),
            remove_threats: d_remove_threats(),
            cleanup: d_cleanup(),
            user_input: d_user_input(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Locale::from_system")]
    pub locale: Locale,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: Locale::from_system(),
            timeouts: Timeouts::default(),
            path: None,
        }
    }
}

impl Settings {
    /// Load settings from the given path, or the default config location.
    /// A missing or unreadable file falls back to defaults; a malformed
    /// file is reported and replaced with defaults rather than aborting
    /// startup.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(default_config_path);
        let Some(path) = path else {
            return Settings::default();
        };

        let mut settings = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(s) => {
                    info!(path = %path.display(), locale = %s.locale, "loaded settings");
                    s
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "settings file is malformed, using defaults");
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        };
        settings.path = Some(path);
        settings
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .or_else(default_config_path)
            .context("no writable config location")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), locale = %self.locale, "saved settings");
        Ok(path)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("winmaint").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_table_matches_the_documented_defaults() {
        let t = Timeouts::default();
        assert_eq!(t.sfc, Duration::from_secs(3600));
        assert_eq!(t.full_scan, Duration::from_secs(7200));
        assert_eq!(t.netsh, Duration::from_secs(60));
        assert_eq!(t.gpu_info, Duration::from_secs(10));
        assert_eq!(t.user_input, Duration::from_secs(60));
    }

    #[test]
    fn partial_settings_fill_in_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"locale":"chinese","timeouts":{"netsh":"90s"}}"#).unwrap();
        assert_eq!(s.locale, Locale::Chinese);
        assert_eq!(s.timeouts.netsh, Duration::from_secs(90));
        assert_eq!(s.timeouts.sfc, Duration::from_secs(3600));
    }

    #[test]
    fn scaling_shrinks_every_timeout() {
        let t = Timeouts::default().scaled(0.01).unwrap();
        assert_eq!(t.sfc, Duration::from_secs(36));
        assert_eq!(t.netsh, Duration::from_millis(600));
        assert!(Timeouts::default().scaled(0.0).is_err());
        assert!(Timeouts::default().scaled(f64::NAN).is_err());
    }

    #[test]
    fn settings_round_trip_through_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.locale = Locale::Chinese;
        s.path = Some(path.clone());
        s.save().unwrap();

        let loaded = Settings::load(Some(&path));
        assert_eq!(loaded.locale, Locale::Chinese);
    }
}
