use crate::recognizer::RecognitionResult;
use notescan_ports::types::NoteRecord;
use serde::{Deserialize, Serialize};

pub const SUCCESS_MESSAGE: &str = "PDF processed successfully";
pub const FALLBACK_MESSAGE: &str = "Processing failed, default notes returned";

/// Body handed back to callers. Success-shaped whether or not the engine worked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    pub message: String,
    pub notes: Vec<NoteRecord>,
    #[serde(rename = "xmlFile", default, skip_serializing_if = "Option::is_none")]
    pub xml_file: Option<String>,
}

impl From<RecognitionResult> for RecognitionResponse {
    fn from(result: RecognitionResult) -> Self {
        let message = if result.is_fallback() {
            FALLBACK_MESSAGE
        } else {
            SUCCESS_MESSAGE
        };
        Self {
            message: message.to_string(),
            notes: result.notes,
            xml_file: result
                .source_artifact_path
                .map(|path| path.to_string_lossy().into_owned()),
        }
    }
}

impl RecognitionResponse {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
