use crate::domain::models::{AcquisitionMode, DateDecoding};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// How often the session log file rolls over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Where session logs go. Every discovery cycle writes its session
/// summaries here, so the file sink is on by default and old files are
/// pruned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub console_enabled: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_true")]
    pub file_enabled: bool,
    /// Defaults to `NB2Collector/logs` under the local data directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default)]
    pub rotation: LogRotation,
    /// Rolled files kept on disk
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console_enabled: true,
            ansi_colors: true,
            file_enabled: true,
            log_dir: None,
            file_name_prefix: default_prefix(),
            rotation: LogRotation::default(),
            max_files: default_max_files(),
        }
    }
}

// Radio stack chatter stays at warn, the collector's own sessions at info
fn default_level() -> String {
    "warn,nb2_collector=info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_prefix() -> String {
    "sessions".to_string()
}
fn default_max_files() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Discovery Settings
    #[serde(default = "default_name_marker")]
    pub name_marker: String,
    #[serde(default = "default_scan_idle_ms")]
    pub scan_idle_ms: u64,
    #[serde(default = "default_scan_limit_ms")]
    pub scan_limit_ms: u64,
    #[serde(default = "default_rescan_delay_ms")]
    pub rescan_delay_ms: u64,

    // Session Settings
    #[serde(default)]
    pub acquisition_mode: AcquisitionMode,
    #[serde(default)]
    pub date_decoding: DateDecoding,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name_marker: default_name_marker(),
            scan_idle_ms: default_scan_idle_ms(),
            scan_limit_ms: default_scan_limit_ms(),
            rescan_delay_ms: default_rescan_delay_ms(),
            acquisition_mode: AcquisitionMode::default(),
            date_decoding: DateDecoding::default(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_name_marker() -> String {
    crate::infrastructure::bluetooth::protocol::DEFAULT_NAME_MARKER.to_string()
}
fn default_scan_idle_ms() -> u64 {
    5000
}
fn default_scan_limit_ms() -> u64 {
    30000
}
fn default_rescan_delay_ms() -> u64 {
    5000
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::open(settings_path))
    }

    /// Load settings from `settings_path`, writing defaults if none exist yet
    pub fn open(settings_path: PathBuf) -> Self {
        match Self::load_from_file(&settings_path) {
            Ok(settings) => Self {
                settings,
                settings_path,
            },
            Err(e) => {
                let service = Self {
                    settings: Settings::default(),
                    settings_path,
                };
                if service.settings_path.exists() {
                    // Keep the user's file around for fixing by hand
                    warn!("Ignoring unreadable settings file: {}", e);
                } else if let Err(e) = service.save() {
                    warn!("Could not write default settings: {}", e);
                }
                service
            }
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("NB2Collector");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
