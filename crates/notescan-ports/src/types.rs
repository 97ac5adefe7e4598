use serde::{Deserialize, Serialize};
use std::fmt;

pub const REST_PITCH: &str = "Rest";
pub const UNKNOWN_DURATION: &str = "Unknown";

/// One musical event as handed to callers.
///
/// `pitch` and `duration` are always populated: real data, the `"Rest"` pitch
/// sentinel, or the `"Unknown"` duration sentinel. `note_type` is only set on
/// synthetic records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub pitch: String,
    pub duration: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
}

impl NoteRecord {
    pub fn new(pitch: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            pitch: pitch.into(),
            duration: duration.into(),
            note_type: None,
        }
    }

    pub fn with_type(mut self, note_type: impl Into<String>) -> Self {
        self.note_type = Some(note_type.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobId(pub u128);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
