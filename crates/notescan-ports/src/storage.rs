use crate::omr::ExportFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_timeout_secs() -> u64 {
    300
}

fn default_enable_diagnostics() -> bool {
    true
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    pub engine_path: Option<String>,
    /// Arguments placed before the engine's own flags, e.g. `["/C", "Audiveris.bat"]`
    /// when the engine is launched through `cmd`.
    pub engine_leading_args: Vec<String>,
    pub output_root: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub export_format: ExportFormat,
    #[serde(default = "default_enable_diagnostics")]
    pub enable_diagnostics: bool,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            engine_path: None,
            engine_leading_args: Vec::new(),
            output_root: None,
            timeout_secs: default_timeout_secs(),
            export_format: ExportFormat::default(),
            enable_diagnostics: default_enable_diagnostics(),
        }
    }
}

impl RecognizerSettings {
    pub fn output_root_or_default(&self) -> PathBuf {
        self.output_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("notescan-omr"))
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<RecognizerSettings, StorageError>;
    fn save_settings(&self, s: &RecognizerSettings) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let settings: RecognizerSettings = serde_json::from_str("{}").expect("parse");
        assert_eq!(settings, RecognizerSettings::default());
        assert_eq!(settings.timeout_secs, 300);
        assert!(settings.enable_diagnostics);
    }

    #[test]
    fn partial_object_keeps_other_defaults() {
        let settings: RecognizerSettings =
            serde_json::from_str(r#"{"engine_path":"/opt/audiveris/bin/Audiveris","export_format":"mxl"}"#)
                .expect("parse");
        assert_eq!(
            settings.engine_path.as_deref(),
            Some("/opt/audiveris/bin/Audiveris")
        );
        assert_eq!(settings.export_format, ExportFormat::Mxl);
        assert_eq!(settings.timeout_secs, 300);
        assert!(settings.enable_diagnostics);
    }
}
