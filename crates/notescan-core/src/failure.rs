use notescan_domain_notes::NotationParseError;
use notescan_ports::omr::OmrError;

/// Why a recognition ended in fallback notes.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("external engine failed: {0}")]
    ExternalEngine(String),
    #[error("engine timed out: {0}")]
    Timeout(String),
    #[error("engine run cancelled")]
    Cancelled,
    #[error("no notation document produced: {0}")]
    ArtifactNotFound(String),
    #[error("notation document unreadable: {0}")]
    Parse(String),
    #[error("notation document contains no notes")]
    EmptyExtraction,
}

impl FailureKind {
    /// Stable identifier used as the `reason=` field in logs and job reports.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::InvalidInput(_) => "invalid_input",
            FailureKind::ExternalEngine(_) => "external_engine",
            FailureKind::Timeout(_) => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::ArtifactNotFound(_) => "artifact_not_found",
            FailureKind::Parse(_) => "parse",
            FailureKind::EmptyExtraction => "empty_extraction",
        }
    }
}

impl From<OmrError> for FailureKind {
    fn from(err: OmrError) -> Self {
        match err {
            OmrError::InvalidInput(msg) => FailureKind::InvalidInput(msg),
            OmrError::Timeout(after) => FailureKind::Timeout(format!("{after:?}")),
            OmrError::Cancelled => FailureKind::Cancelled,
            OmrError::ArtifactNotFound(dir) => {
                FailureKind::ArtifactNotFound(dir.display().to_string())
            }
            OmrError::EngineFailed { code, log } => FailureKind::ExternalEngine(match log {
                Some(log) => format!("exit code {code}, log at {}", log.display()),
                None => format!("exit code {code}"),
            }),
            other @ (OmrError::Launch(_) | OmrError::Backend(_)) => {
                FailureKind::ExternalEngine(other.to_string())
            }
        }
    }
}

impl From<NotationParseError> for FailureKind {
    fn from(err: NotationParseError) -> Self {
        FailureKind::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn engine_errors_map_to_failure_kinds() {
        assert_eq!(
            FailureKind::from(OmrError::Launch("not found".to_string())).code(),
            "external_engine"
        );
        assert_eq!(
            FailureKind::from(OmrError::EngineFailed {
                code: "1".to_string(),
                log: None
            }),
            FailureKind::ExternalEngine("exit code 1".to_string())
        );
        assert_eq!(
            FailureKind::from(OmrError::Timeout(Duration::from_secs(1))).code(),
            "timeout"
        );
        assert_eq!(
            FailureKind::from(OmrError::ArtifactNotFound(PathBuf::from("/tmp/job"))),
            FailureKind::ArtifactNotFound("/tmp/job".to_string())
        );
    }

    #[test]
    fn parse_errors_map_to_parse() {
        let kind = FailureKind::from(NotationParseError::MissingParts);
        assert_eq!(kind.code(), "parse");
        assert_eq!(kind.to_string(), "notation document unreadable: no parts found in document");
    }
}
