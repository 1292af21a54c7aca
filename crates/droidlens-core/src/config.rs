//! Persistent configuration for droidlens.
//!
//! Stores user settings in `~/.droidlens/config.json`: the adb
//! executable path, the fixed device-side paths used by the capture
//! pipelines, and the directory holding bundled helper binaries.
//!
//! # Example
//!
//! ```no_run
//! use droidlens_core::config::DroidlensConfig;
//!
//! // Load (returns defaults if the file doesn't exist)
//! let config = DroidlensConfig::load();
//! println!("adb at: {}", config.adb_path);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.json";

/// Returns the droidlens home directory (`~/.droidlens`), creating it
/// if needed. Falls back to a relative `.droidlens` when no home
/// directory is available.
pub fn droidlens_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".droidlens");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Persistent droidlens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DroidlensConfig {
    /// Path or name of the adb executable.
    pub adb_path: String,

    /// Remote path the helper binary is staged to.
    pub helper_remote_path: String,

    /// Directory holding `toybox-<arch>` binaries. `None` means
    /// `~/.droidlens/toybox`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper_dir_override: Option<PathBuf>,

    /// Device path the extraction script is pushed to and launched from.
    pub script_remote_path: String,

    /// Device path the extraction script writes its JSON result to.
    pub result_remote_path: String,

    /// Local copy of the extraction script; pushed before each scripted
    /// capture when it exists. `None` disables the push.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_script: Option<PathBuf>,
}

impl Default for DroidlensConfig {
    fn default() -> Self {
        Self {
            adb_path: "adb".to_string(),
            helper_remote_path: "/data/local/tmp/toybox".to_string(),
            helper_dir_override: None,
            script_remote_path: "/storage/emulated/0/Scripts/get_ui_tree.js".to_string(),
            result_remote_path: "/sdcard/autojs_ui_tree.json".to_string(),
            local_script: Some(PathBuf::from("assets/get_ui_tree.js")),
        }
    }
}

impl DroidlensConfig {
    /// Load config from `~/.droidlens/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        let path = droidlens_dir().join(CONFIG_FILENAME);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.droidlens/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let path = droidlens_dir().join(CONFIG_FILENAME);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// The effective helper-binary directory.
    pub fn helper_dir(&self) -> PathBuf {
        self.helper_dir_override
            .clone()
            .unwrap_or_else(|| droidlens_dir().join("toybox"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let config = DroidlensConfig::default();
        assert_eq!(config.adb_path, "adb");
        assert_eq!(config.helper_remote_path, "/data/local/tmp/toybox");
        assert_eq!(config.result_remote_path, "/sdcard/autojs_ui_tree.json");
        assert!(config
            .script_remote_path
            .ends_with("Scripts/get_ui_tree.js"));
    }

    #[test]
    fn roundtrip_serialization() {
        let config = DroidlensConfig {
            adb_path: "/opt/platform-tools/adb".to_string(),
            helper_dir_override: Some(PathBuf::from("/opt/toybox")),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let loaded: DroidlensConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.adb_path, config.adb_path);
        assert_eq!(loaded.helper_dir_override, config.helper_dir_override);
    }

    #[test]
    fn deserialize_empty_json_uses_defaults() {
        let loaded: DroidlensConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(loaded.adb_path, "adb");
    }

    #[test]
    fn helper_dir_override_wins() {
        let config = DroidlensConfig {
            helper_dir_override: Some(PathBuf::from("/opt/toybox")),
            ..Default::default()
        };
        assert_eq!(config.helper_dir(), PathBuf::from("/opt/toybox"));
    }
}
