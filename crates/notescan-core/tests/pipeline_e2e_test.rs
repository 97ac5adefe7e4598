#![cfg(unix)]

use notescan_core::{Recognizer, RecognizerConfig, MAX_TIMEOUT_SECS};
use notescan_infra_omr_audiveris::AudiverisOmr;
use notescan_ports::omr::ExportFormat;
use notescan_ports::storage::RecognizerSettings;
use notescan_ports::types::NoteRecord;
use std::path::Path;
use std::time::Duration;

const SCRIPT_PRELUDE: &str = r#"
out=""
last=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    -output) shift; out="$1" ;;
  esac
  last="$1"
  shift
done
stem=$(basename "$last" .pdf)
"#;

fn script_engine(dir: &Path, body: &str) -> AudiverisOmr {
    let script = dir.join("engine.sh");
    std::fs::write(&script, format!("{SCRIPT_PRELUDE}\n{body}\n")).expect("write script");
    AudiverisOmr::new(Some("/bin/sh".to_string()))
        .with_leading_args(vec![script.to_string_lossy().into_owned()])
}

fn recognizer(dir: &Path, body: &str, timeout: Duration) -> Recognizer {
    Recognizer::new(
        Box::new(script_engine(dir, body)),
        RecognizerConfig {
            output_root: dir.join("omr-out"),
            timeout,
            export_format: ExportFormat::Xml,
            enable_diagnostics: true,
        },
    )
}

fn pdf(dir: &Path) -> String {
    let path = dir.join("nocturne.pdf");
    std::fs::write(&path, b"%PDF-1.4\n").expect("write pdf");
    path.to_string_lossy().into_owned()
}

#[test]
fn engine_output_flows_through_to_notes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let body = r#"cat > "$out/$stem.xml" <<'EOF'
<score-partwise version="3.1">
  <part id="P1">
    <measure number="1">
      <note><pitch><step>A</step><octave>3</octave></pitch><duration>2</duration></note>
    </measure>
    <measure number="2">
      <note><rest/><duration>2</duration></note>
      <note><pitch><step>B</step><octave>3</octave></pitch></note>
    </measure>
  </part>
</score-partwise>
EOF"#;
    let recognizer = recognizer(dir.path(), body, Duration::from_secs(20));

    let result = recognizer.recognize(&pdf(dir.path()));

    assert!(!result.is_fallback(), "reason: {:?}", result.fallback_reason);
    assert_eq!(
        result.notes,
        vec![
            NoteRecord::new("A3", "2"),
            NoteRecord::new("Rest", "2"),
            NoteRecord::new("B3", "Unknown"),
        ]
    );
    let artifact = result.source_artifact_path.expect("artifact");
    assert_eq!(artifact.file_name().and_then(|n| n.to_str()), Some("nocturne.xml"));
}

#[test]
fn failing_engine_yields_fallback_notes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recognizer = recognizer(dir.path(), "exit 2", Duration::from_secs(20));

    let result = recognizer.recognize(&pdf(dir.path()));

    assert_eq!(result.notes.len(), 45);
    assert_eq!(result.fallback_reason.expect("reason").code(), "external_engine");
}

#[test]
fn hung_engine_yields_fallback_notes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recognizer = recognizer(dir.path(), "sleep 10", Duration::from_millis(300));

    let result = recognizer.recognize(&pdf(dir.path()));

    assert_eq!(result.notes.len(), 45);
    assert_eq!(result.fallback_reason.expect("reason").code(), "timeout");
}

#[test]
fn oversized_timeout_setting_is_clamped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = RecognizerSettings {
        output_root: Some(dir.path().join("omr-out")),
        timeout_secs: u64::MAX,
        ..RecognizerSettings::default()
    };
    let config = RecognizerConfig::from_settings(&settings);
    assert_eq!(config.timeout, Duration::from_secs(MAX_TIMEOUT_SECS));

    let body = r#"cat > "$out/$stem.xml" <<'EOF'
<score-partwise><part id="P1"><measure number="1">
<note><pitch><step>E</step><octave>5</octave></pitch><duration>4</duration></note>
</measure></part></score-partwise>
EOF"#;
    let recognizer = Recognizer::new(Box::new(script_engine(dir.path(), body)), config);

    let result = recognizer.recognize(&pdf(dir.path()));

    assert!(!result.is_fallback(), "reason: {:?}", result.fallback_reason);
    assert_eq!(result.notes, vec![NoteRecord::new("E5", "4")]);
}

#[test]
fn missing_input_yields_fallback_notes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let recognizer = recognizer(dir.path(), "exit 0", Duration::from_secs(20));

    let result = recognizer.recognize(&dir.path().join("absent.pdf").to_string_lossy());

    assert_eq!(result.notes.len(), 45);
    assert_eq!(result.fallback_reason.expect("reason").code(), "invalid_input");
}
