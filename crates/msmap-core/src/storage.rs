use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::view::ViewSettings;
use crate::{MapError, Result};

pub const HOME_ENV: &str = "MSMAP_HOME";
pub const MAP_ENV: &str = "MSMAP_MAP";

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_MAP_FILE: &str = "management-map.json";
const DEFAULT_CHECKLIST_FILE: &str = "checklist.json";

/// Resolve the local data directory (~/.msmap/, or $MSMAP_HOME).
pub fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".msmap")
}

// --- Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Static management map document consumed by the wizard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_path: Option<PathBuf>,
    /// Where checklist progress is kept between sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist_path: Option<PathBuf>,
    /// Map view toggles, remembered between sessions
    #[serde(default)]
    pub view: ViewSettings,
}

impl Settings {
    /// $MSMAP_MAP, then the configured path, then ~/.msmap/management-map.json.
    pub fn map_path(&self, dir: &Path) -> PathBuf {
        if let Some(env) = std::env::var_os(MAP_ENV) {
            return PathBuf::from(env);
        }
        self.map_path
            .clone()
            .unwrap_or_else(|| dir.join(DEFAULT_MAP_FILE))
    }

    pub fn checklist_path(&self, dir: &Path) -> PathBuf {
        self.checklist_path
            .clone()
            .unwrap_or_else(|| dir.join(DEFAULT_CHECKLIST_FILE))
    }
}

/// Read settings from `dir`. A missing or unreadable file yields defaults.
pub fn read_settings(dir: &Path) -> Settings {
    let path = dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Settings::default();
    }
    match fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            Settings::default()
        }
    }
}

pub fn write_settings(dir: &Path, settings: &Settings) -> Result<()> {
    write_json_atomic(&dir.join(SETTINGS_FILE), settings)
}

// --- Files ---

/// Write JSON via temp file + rename so readers never observe a half-written file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state.json".to_string());
    let tmp = dir.join(format!(".{}.tmp", name));
    fs::write(&tmp, json).map_err(|source| io_error(&tmp, source))?;
    fs::rename(&tmp, path).map_err(|source| io_error(path, source))
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> MapError {
    MapError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_are_default() {
        let dir = tempdir().unwrap();
        assert_eq!(read_settings(dir.path()), Settings::default());
    }

    #[test]
    fn corrupt_settings_are_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();
        assert_eq!(read_settings(dir.path()), Settings::default());
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            map_path: Some(PathBuf::from("/srv/qms/map.json")),
            checklist_path: None,
            view: ViewSettings {
                show_external: false,
                ..Default::default()
            },
        };
        write_settings(dir.path(), &settings).unwrap();
        assert_eq!(read_settings(dir.path()), settings);
        assert!(!dir.path().join(".settings.json.tmp").exists());
    }

    #[test]
    fn partial_view_settings_keep_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "view": { "showNonCritical": false } }"#,
        )
        .unwrap();
        let view = read_settings(dir.path()).view;
        assert!(!view.show_non_critical);
        assert!(view.show_dependencies);
        assert!(view.show_external);
    }

    #[test]
    fn checklist_path_defaults_inside_data_dir() {
        let dir = tempdir().unwrap();
        let settings = Settings::default();
        assert_eq!(
            settings.checklist_path(dir.path()),
            dir.path().join("checklist.json")
        );
    }

    #[test]
    fn atomic_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state.json");
        write_json_atomic(&path, &serde_json::json!({ "ok": true })).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"ok\": true"));
    }
}
