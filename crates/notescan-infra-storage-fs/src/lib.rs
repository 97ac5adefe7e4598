use notescan_ports::storage::{RecognizerSettings, StorageError, StoragePort};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

pub struct FsSettingsStore {
    settings_path: PathBuf,
}

impl FsSettingsStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            settings_path: base_dir.join(SETTINGS_FILE),
        }
    }

    /// Store backed by an explicit settings file rather than a base directory.
    pub fn from_file(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("notescan"))
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| StorageError::Io(e.to_string()))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
    }
}

impl Default for FsSettingsStore {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(base_dir)
    }
}

impl StoragePort for FsSettingsStore {
    fn load_settings(&self) -> Result<RecognizerSettings, StorageError> {
        if !self.settings_path.exists() {
            return Ok(RecognizerSettings::default());
        }
        Self::read_json(&self.settings_path)
    }

    fn save_settings(&self, s: &RecognizerSettings) -> Result<(), StorageError> {
        Self::write_json(&self.settings_path, s)
    }
}
