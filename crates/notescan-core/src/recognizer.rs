use crate::diagnostics::export_job_report;
use crate::failure::FailureKind;
use log::{info, warn};
use notescan_domain_notes::{extract_notes_path, generate_fallback_notes};
use notescan_ports::omr::{CancelFlag, ExportFormat, OmrOptions, OmrPort};
use notescan_ports::storage::RecognizerSettings;
use notescan_ports::types::{JobId, NoteRecord};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Upper bound for the engine timeout, one day.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct RecognizerConfig {
    /// Parent of every per-job output directory.
    pub output_root: PathBuf,
    pub timeout: Duration,
    pub export_format: ExportFormat,
    pub enable_diagnostics: bool,
}

impl RecognizerConfig {
    pub fn from_settings(settings: &RecognizerSettings) -> Self {
        Self {
            output_root: settings.output_root_or_default(),
            timeout: Duration::from_secs(settings.timeout_secs.clamp(1, MAX_TIMEOUT_SECS)),
            export_format: settings.export_format,
            enable_diagnostics: settings.enable_diagnostics,
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self::from_settings(&RecognizerSettings::default())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognitionResult {
    pub job_id: JobId,
    pub notes: Vec<NoteRecord>,
    pub source_artifact_path: Option<PathBuf>,
    pub fallback_reason: Option<FailureKind>,
}

impl RecognitionResult {
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }

    fn extracted(job_id: JobId, artifact: PathBuf, notes: Vec<NoteRecord>) -> Self {
        Self {
            job_id,
            notes,
            source_artifact_path: Some(artifact),
            fallback_reason: None,
        }
    }

    fn fallback(job_id: JobId, reason: FailureKind) -> Self {
        Self {
            job_id,
            notes: generate_fallback_notes(),
            source_artifact_path: None,
            fallback_reason: Some(reason),
        }
    }
}

/// Runs scanned scores through the OMR engine and extracts their notes.
///
/// `recognize` always yields a non-empty note list: every failure along the
/// way is logged and replaced by fallback notes.
pub struct Recognizer {
    omr: Box<dyn OmrPort>,
    config: RecognizerConfig,
}

impl Recognizer {
    pub fn new(omr: Box<dyn OmrPort>, config: RecognizerConfig) -> Self {
        Self { omr, config }
    }

    pub fn recognize(&self, input_path: &str) -> RecognitionResult {
        self.recognize_with_cancel(input_path, None)
    }

    pub fn recognize_with_cancel(
        &self,
        input_path: &str,
        cancel: Option<CancelFlag>,
    ) -> RecognitionResult {
        let job_id = JobId(Uuid::new_v4().as_u128());
        let job_dir = self.job_dir(job_id);
        let started = Instant::now();

        let result = match self.run_pipeline(input_path, &job_dir, cancel) {
            Ok((artifact, notes)) => {
                info!(
                    "event=recognition_ok job={} notes={} artifact={} elapsed_ms={}",
                    job_id,
                    notes.len(),
                    artifact.display(),
                    started.elapsed().as_millis()
                );
                RecognitionResult::extracted(job_id, artifact, notes)
            }
            Err(reason) => {
                warn!(
                    "event=recognition_fallback job={} reason={} detail=\"{}\" elapsed_ms={}",
                    job_id,
                    reason.code(),
                    reason,
                    started.elapsed().as_millis()
                );
                RecognitionResult::fallback(job_id, reason)
            }
        };

        // Inputs rejected before launch never get a job directory.
        if self.config.enable_diagnostics && job_dir.is_dir() {
            if let Err(err) =
                export_job_report(&job_dir, input_path, &result, started.elapsed().as_millis())
            {
                warn!("event=job_report status=error job={} error={}", job_id, err);
            }
        }

        result
    }

    fn job_dir(&self, job_id: JobId) -> PathBuf {
        self.config.output_root.join(format!("job-{job_id}"))
    }

    fn run_pipeline(
        &self,
        input_path: &str,
        job_dir: &Path,
        cancel: Option<CancelFlag>,
    ) -> Result<(PathBuf, Vec<NoteRecord>), FailureKind> {
        let options = OmrOptions {
            output_dir: job_dir.to_path_buf(),
            timeout: self.config.timeout,
            export_format: self.config.export_format,
            enable_diagnostics: self.config.enable_diagnostics,
            cancel,
        };

        let omr = self.omr.recognize_pdf(input_path, options)?;
        let notes = extract_notes_path(&omr.musicxml_path)?;
        if notes.is_empty() {
            return Err(FailureKind::EmptyExtraction);
        }
        Ok((omr.musicxml_path, notes))
    }
}
