use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "muzic";
const SETTINGS_FILE: &str = "settings.json";

/// User configuration. Holds where the media lives and how the player
/// behaves, never what was playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub folders: Vec<PathBuf>,
    #[serde(default = "default_asset_limit")]
    pub asset_limit: usize,
    #[serde(default = "default_finish_poll_millis")]
    pub finish_poll_millis: u64,
    #[serde(default = "default_seek_step_seconds")]
    pub seek_step_seconds: u16,
}

fn default_asset_limit() -> usize {
    3000
}

fn default_finish_poll_millis() -> u64 {
    250
}

fn default_seek_step_seconds() -> u16 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            asset_limit: default_asset_limit(),
            finish_poll_millis: default_finish_poll_millis(),
            seek_step_seconds: default_seek_step_seconds(),
        }
    }
}

impl Settings {
    pub fn finish_poll_interval(&self) -> Duration {
        Duration::from_millis(self.finish_poll_millis.max(1))
    }

    /// Adds a folder unless an equivalent path is already present.
    pub fn add_folder(&mut self, folder: &Path) -> bool {
        let normalized = normalize_path(folder);
        if self.folders.iter().any(|existing| existing == &normalized) {
            return false;
        }
        self.folders.push(normalized);
        true
    }
}

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("MUZIC_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn settings_path() -> Result<PathBuf> {
    Ok(config_root()?.join(SETTINGS_FILE))
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path()?, settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn normalize_path(path: &Path) -> PathBuf {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    strip_windows_verbatim_prefix(&canonical)
}

pub fn strip_windows_verbatim_prefix(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();

    if let Some(trimmed) = raw.strip_prefix(r"\\?\UNC\") {
        return PathBuf::from(format!(r"\\{trimmed}"));
    }

    if let Some(trimmed) = raw.strip_prefix(r"\\?\") {
        return PathBuf::from(trimmed);
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = Settings {
            folders: vec![PathBuf::from("/music")],
            asset_limit: 12,
            ..Settings::default()
        };
        save_settings_to(&path, &settings).expect("save");
        let loaded = load_settings_from(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let loaded = load_settings_from(&dir.path().join("absent.json")).expect("load");
        assert_eq!(loaded, Settings::default());
        assert_eq!(loaded.asset_limit, 3000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"finish_poll_millis": 100}"#).expect("write");

        let loaded = load_settings_from(&path).expect("load");
        assert_eq!(loaded.finish_poll_millis, 100);
        assert_eq!(loaded.seek_step_seconds, 5);
        assert!(loaded.folders.is_empty());
    }

    #[test]
    fn add_folder_skips_duplicates() {
        let dir = tempdir().expect("tempdir");
        let mut settings = Settings::default();
        assert!(settings.add_folder(dir.path()));
        assert!(!settings.add_folder(dir.path()));
        assert_eq!(settings.folders.len(), 1);
    }

    #[test]
    fn strips_windows_verbatim_prefix() {
        let cleaned = strip_windows_verbatim_prefix(Path::new(r"\\?\E:\LOCALMUSIC\a.mp3"));
        assert_eq!(cleaned, PathBuf::from(r"E:\LOCALMUSIC\a.mp3"));
    }
}
