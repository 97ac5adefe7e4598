use notescan_ports::omr::{ExportFormat, OmrError, OmrOptions, OmrPort, OmrResult};
use std::cmp::Reverse;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant, SystemTime};

const DIAGNOSTICS_LOG: &str = "audiveris.log";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_SEARCH_DEPTH: usize = 6;
const UNCOMPRESSED_EXPORT_OPTION: &str = "org.audiveris.omr.sheet.BookManager.useCompression=false";

pub struct AudiverisOmr {
    default_engine_path: Option<String>,
    leading_args: Vec<String>,
}

impl AudiverisOmr {
    pub fn new(default_engine_path: Option<String>) -> Self {
        Self {
            default_engine_path,
            leading_args: Vec::new(),
        }
    }

    /// Arguments passed ahead of the engine flags, for engines started through
    /// a launcher such as `cmd /C Audiveris.bat`.
    pub fn with_leading_args(mut self, leading_args: Vec<String>) -> Self {
        self.leading_args = leading_args;
        self
    }

    fn engine_path(&self) -> String {
        let engine = self
            .default_engine_path
            .clone()
            .filter(|engine| !engine.trim().is_empty())
            .unwrap_or_else(|| "audiveris".to_string());
        normalize_engine_path(&engine)
    }

    fn build_command(&self, engine: &str, input_path: &Path, options: &OmrOptions) -> Command {
        let mut command = Command::new(engine);
        command
            .args(&self.leading_args)
            .arg("-batch")
            .arg("-export");
        if options.export_format == ExportFormat::Xml {
            command.arg("-option").arg(UNCOMPRESSED_EXPORT_OPTION);
        }
        command.arg("-output").arg(&options.output_dir).arg(input_path);
        command
    }
}

impl OmrPort for AudiverisOmr {
    fn recognize_pdf(&self, pdf_path: &str, options: OmrOptions) -> Result<OmrResult, OmrError> {
        let engine = self.engine_path();
        let input_path = absolute_input_path(pdf_path)?;
        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| OmrError::InvalidInput("invalid pdf filename".to_string()))?
            .to_string();

        fs::create_dir_all(&options.output_dir).map_err(|e| {
            OmrError::Backend(format!(
                "cannot create output dir {}: {e}",
                options.output_dir.display()
            ))
        })?;

        let diagnostics_path = options
            .enable_diagnostics
            .then(|| options.output_dir.join(DIAGNOSTICS_LOG));
        let (stdout, stderr) = output_sinks(diagnostics_path.as_deref())?;

        log::info!(
            "event=omr_start engine={} input={} output_dir={} timeout_ms={}",
            engine,
            input_path.display(),
            options.output_dir.display(),
            options.timeout.as_millis()
        );

        // Output goes straight to a file (or nowhere) so a chatty engine cannot fill a pipe.
        let child = self
            .build_command(&engine, &input_path, &options)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                OmrError::Launch(if e.kind() == std::io::ErrorKind::NotFound {
                    format!("Audiveris not found at `{engine}`")
                } else {
                    format!("failed to launch `{engine}`: {e}")
                })
            })?;

        let started = Instant::now();
        let status = wait_for_exit(child, &options)?;
        log::info!(
            "event=omr_exit status={} elapsed_ms={}",
            status,
            started.elapsed().as_millis()
        );

        if !status.success() {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string());
            return Err(OmrError::EngineFailed {
                code,
                log: diagnostics_path,
            });
        }

        let musicxml_path =
            find_output_musicxml(&options.output_dir, &stem, options.export_format)
                .ok_or_else(|| OmrError::ArtifactNotFound(options.output_dir.clone()))?;

        Ok(OmrResult {
            musicxml_path,
            diagnostics_path,
        })
    }
}

fn absolute_input_path(pdf_path: &str) -> Result<PathBuf, OmrError> {
    let path = Path::new(pdf_path.trim());
    if path.as_os_str().is_empty() {
        return Err(OmrError::InvalidInput("empty input path".to_string()));
    }
    if !path.is_file() {
        return Err(OmrError::InvalidInput(format!(
            "{} is not a file",
            path.display()
        )));
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| OmrError::Backend(e.to_string()))?;
    Ok(cwd.join(path))
}

fn output_sinks(diagnostics_path: Option<&Path>) -> Result<(Stdio, Stdio), OmrError> {
    let Some(path) = diagnostics_path else {
        return Ok((Stdio::null(), Stdio::null()));
    };
    let log_file = File::create(path)
        .map_err(|e| OmrError::Backend(format!("failed to create diagnostics log: {e}")))?;
    let log_file_err = log_file
        .try_clone()
        .map_err(|e| OmrError::Backend(format!("failed to clone diagnostics log handle: {e}")))?;
    Ok((Stdio::from(log_file), Stdio::from(log_file_err)))
}

fn wait_for_exit(mut child: Child, options: &OmrOptions) -> Result<ExitStatus, OmrError> {
    // A timeout past the clock's range means no deadline.
    let deadline = Instant::now().checked_add(options.timeout);
    loop {
        if options
            .cancel
            .as_ref()
            .is_some_and(|cancel| cancel.is_cancelled())
        {
            stop_child(&mut child);
            return Err(OmrError::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                stop_child(&mut child);
                return Err(OmrError::Timeout(options.timeout));
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(err) => {
                stop_child(&mut child);
                return Err(OmrError::Backend(format!(
                    "failed waiting for engine: {err}"
                )));
            }
        }
    }
}

fn stop_child(child: &mut Child) {
    if let Err(err) = child.kill() {
        log::debug!("event=omr_kill status=error error={}", err);
    }
    let _ = child.wait();
}

pub fn normalize_engine_path(engine: &str) -> String {
    let engine = engine.trim();
    let path = Path::new(engine);
    let ext_is_app = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("app"));

    if ext_is_app {
        let candidate = path.join("Contents").join("MacOS").join("Audiveris");
        if candidate.exists() {
            return candidate.to_string_lossy().into_owned();
        }
    }

    engine.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Picks the notation document a job produced.
///
/// Order: file stem equal to the input stem, then the requested export
/// extension, then newest modification time, then smallest path.
pub fn select_artifact(
    candidates: &[ArtifactCandidate],
    stem: &str,
    format: ExportFormat,
) -> Option<PathBuf> {
    candidates
        .iter()
        .max_by_key(|candidate| {
            let stem_matches = candidate
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s == stem);
            let preferred_ext = has_extension(&candidate.path, format.extension());
            (
                stem_matches,
                preferred_ext,
                candidate.modified,
                Reverse(candidate.path.clone()),
            )
        })
        .map(|candidate| candidate.path.clone())
}

pub fn find_output_musicxml(output_dir: &Path, stem: &str, format: ExportFormat) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    collect_candidates(output_dir, 0, &mut candidates);
    if candidates.len() > 1 {
        log::debug!(
            "event=omr_artifacts count={} dir={}",
            candidates.len(),
            output_dir.display()
        );
    }
    select_artifact(&candidates, stem, format)
}

fn collect_candidates(dir: &Path, depth: usize, out: &mut Vec<ArtifactCandidate>) {
    if depth > MAX_SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_candidates(&path, depth + 1, out);
            continue;
        }
        if !(has_extension(&path, "xml") || has_extension(&path, "mxl")) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        out.push(ArtifactCandidate { path, modified });
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn candidate(path: &str, secs: u64) -> ArtifactCandidate {
        ArtifactCandidate {
            path: PathBuf::from(path),
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn stem_match_wins_over_newer_files() {
        let candidates = vec![
            candidate("/out/other.xml", 50),
            candidate("/out/sonata/sonata.xml", 10),
        ];
        assert_eq!(
            select_artifact(&candidates, "sonata", ExportFormat::Xml),
            Some(PathBuf::from("/out/sonata/sonata.xml"))
        );
    }

    #[test]
    fn requested_extension_wins_over_other_extension() {
        let candidates = vec![
            candidate("/out/sonata.mxl", 50),
            candidate("/out/sonata.xml", 10),
        ];
        assert_eq!(
            select_artifact(&candidates, "sonata", ExportFormat::Xml),
            Some(PathBuf::from("/out/sonata.xml"))
        );
        assert_eq!(
            select_artifact(&candidates, "sonata", ExportFormat::Mxl),
            Some(PathBuf::from("/out/sonata.mxl"))
        );
    }

    #[test]
    fn newest_then_smallest_path_breaks_ties() {
        let candidates = vec![
            candidate("/out/b.xml", 20),
            candidate("/out/c.xml", 30),
            candidate("/out/a.xml", 30),
        ];
        assert_eq!(
            select_artifact(&candidates, "input", ExportFormat::Xml),
            Some(PathBuf::from("/out/a.xml"))
        );
    }

    #[test]
    fn no_candidates_selects_nothing() {
        assert_eq!(select_artifact(&[], "input", ExportFormat::Xml), None);
    }

    #[test]
    fn plain_engine_path_is_kept() {
        assert_eq!(normalize_engine_path("  audiveris "), "audiveris");
    }
}
