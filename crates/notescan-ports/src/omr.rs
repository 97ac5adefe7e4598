use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Notation format the engine is asked to export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Plain MusicXML (`.xml`).
    #[default]
    Xml,
    /// Compressed MusicXML (`.mxl`), the engine's native export.
    Mxl,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xml => "xml",
            ExportFormat::Mxl => "mxl",
        }
    }
}

/// Shared flag a caller can raise to abort a running engine process.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug)]
pub struct OmrOptions {
    /// Directory the engine writes into. Owned by a single job.
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub export_format: ExportFormat,
    pub enable_diagnostics: bool,
    pub cancel: Option<CancelFlag>,
}

#[derive(Clone, Debug)]
pub struct OmrResult {
    pub musicxml_path: PathBuf,
    pub diagnostics_path: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OmrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to launch engine: {0}")]
    Launch(String),
    #[error("engine exited with code {code}")]
    EngineFailed { code: String, log: Option<PathBuf> },
    #[error("engine timed out after {0:?}")]
    Timeout(Duration),
    #[error("engine run cancelled")]
    Cancelled,
    #[error("no notation document produced in {0}")]
    ArtifactNotFound(PathBuf),
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait OmrPort: Send + Sync {
    fn recognize_pdf(&self, pdf_path: &str, options: OmrOptions) -> Result<OmrResult, OmrError>;
}
