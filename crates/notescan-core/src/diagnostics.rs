use crate::recognizer::RecognitionResult;
use notescan_ports::storage::StorageError;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const JOB_REPORT_FILE: &str = "job.json";

#[derive(Serialize)]
struct AppVersion {
    name: String,
    version: String,
}

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct JobReport<'a> {
    job_id: String,
    input: &'a str,
    outcome: &'static str,
    reason: Option<&'static str>,
    detail: Option<String>,
    note_count: usize,
    artifact: Option<String>,
    elapsed_ms: u128,
    app: AppVersion,
    platform: PlatformInfo,
}

/// Writes `job.json` describing how one recognition ended.
pub fn export_job_report(
    dir: &Path,
    input: &str,
    result: &RecognitionResult,
    elapsed_ms: u128,
) -> Result<(), StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::Io(e.to_string()))?;

    let report = JobReport {
        job_id: result.job_id.to_string(),
        input,
        outcome: if result.is_fallback() {
            "fallback"
        } else {
            "extracted"
        },
        reason: result.fallback_reason.as_ref().map(|reason| reason.code()),
        detail: result.fallback_reason.as_ref().map(|reason| reason.to_string()),
        note_count: result.notes.len(),
        artifact: result
            .source_artifact_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned()),
        elapsed_ms,
        app: AppVersion {
            name: "notescan".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
    };

    write_json(&dir.join(JOB_REPORT_FILE), &report)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let data = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
    fs::write(path, data).map_err(|e| StorageError::Io(e.to_string()))
}
