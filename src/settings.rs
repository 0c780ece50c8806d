//! Persisted application settings.
//!
//! The mirror configuration is stored as a raw JSON blob and run through the
//! config migrator on every load, so older files keep working.

use anyhow::{Context, Result};
use courtside_core::migrate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Current settings schema version - increment when making breaking changes
pub const SETTINGS_VERSION: u32 = 1;

fn default_settings_version() -> u32 {
    SETTINGS_VERSION
}

fn default_mirror() -> Value {
    serde_json::to_value(courtside_core::MirrorConfig::default()).unwrap_or(Value::Null)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Settings schema version for migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,
    /// Mirror configuration blob (inputs, field mappings, connection)
    #[serde(default = "default_mirror")]
    pub mirror: Value,
    /// Base URL where the remote system can fetch local logos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_base_url: Option<String>,
    /// Match state file loaded at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_file: Option<PathBuf>,
    /// Push every input after loading a match file
    #[serde(default = "default_auto_push")]
    pub auto_push: bool,
}

fn default_auto_push() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            mirror: default_mirror(),
            asset_base_url: None,
            match_file: None,
            auto_push: default_auto_push(),
        }
    }
}

/// Get the config directory path
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("courtside")
}

pub fn get_settings_path() -> PathBuf {
    get_config_dir().join("settings.json")
}

/// Load settings with robust error handling and migration support.
///
/// Never fails: unreadable files fall back to defaults, partially broken
/// files are recovered field by field and rewritten.
pub fn load_settings_from(path: &Path) -> AppSettings {
    if !path.exists() {
        log::info!("Settings file not found at {}, using defaults", path.display());
        return AppSettings::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::error!("Failed to read settings file {}: {}", path.display(), e);
            return AppSettings::default();
        }
    };

    match serde_json::from_str::<AppSettings>(&content) {
        Ok(settings) => return migrate_settings(settings, path),
        Err(e) => {
            log::warn!("Failed to parse settings directly: {}, attempting partial recovery", e);
        }
    }

    match recover_settings_from_json(&content) {
        Ok(settings) => {
            log::info!("Recovered settings with partial data");
            let settings = migrate_settings(settings, path);
            if let Err(e) = save_settings_to(&settings, path) {
                log::warn!("Failed to save recovered settings: {}", e);
            }
            settings
        }
        Err(e) => {
            log::error!("Failed to recover settings from {}: {:#}", path.display(), e);
            AppSettings::default()
        }
    }
}

fn recover_settings_from_json(content: &str) -> Result<AppSettings> {
    let value: Value = serde_json::from_str(content).context("Settings file is not valid JSON")?;
    let obj = value
        .as_object()
        .context("Settings file root is not a JSON object")?;

    let mut settings = AppSettings::default();

    if let Some(v) = obj.get("version").and_then(|v| v.as_u64()) {
        settings.version = u32::try_from(v).unwrap_or(SETTINGS_VERSION);
    }
    if let Some(v) = obj.get("mirror") {
        if v.is_object() {
            settings.mirror = v.clone();
        } else {
            log::warn!("Could not parse mirror configuration, using default");
        }
    }
    if let Some(v) = obj.get("asset_base_url") {
        settings.asset_base_url = serde_json::from_value(v.clone()).unwrap_or_else(|_| {
            log::warn!("Could not parse asset_base_url, ignoring it");
            None
        });
    }
    if let Some(v) = obj.get("match_file") {
        settings.match_file = serde_json::from_value(v.clone()).unwrap_or(None);
    }
    if let Some(v) = obj.get("auto_push").and_then(|v| v.as_bool()) {
        settings.auto_push = v;
    }

    Ok(settings)
}

fn migrate_settings(mut settings: AppSettings, path: &Path) -> AppSettings {
    let original_version = settings.version;
    let original_mirror = settings.mirror.clone();

    if settings.version < SETTINGS_VERSION {
        log::info!(
            "Migrating settings from v{} to v{}",
            settings.version,
            SETTINGS_VERSION
        );
        settings.version = SETTINGS_VERSION;
    }
    settings.mirror = migrate::migrate(&settings.mirror);

    if original_version != settings.version || original_mirror != settings.mirror {
        if let Err(e) = save_settings_to(&settings, path) {
            log::warn!("Failed to save migrated settings: {}", e);
        }
    }
    settings
}

pub fn save_settings_to(settings: &AppSettings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
