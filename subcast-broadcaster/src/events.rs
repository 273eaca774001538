use serde::{Deserialize, Serialize};

/// Record pushed to every connected viewer for one translation result.
///
/// Fields that the exporter is configured not to emit are serialized as
/// `null` rather than omitted, so viewers can rely on a fixed shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    /// `"H:MM:SS,mmm --> H:MM:SS,mmm"` when timestamps are enabled
    pub timestamp: Option<String>,
    pub transcribed_text: Option<String>,
    pub translated_text: Option<String>,
    /// Raw (start, end) in seconds
    pub time_range: (f64, f64),
}

impl OutgoingMessage {
    /// Convert message to a JSON text frame payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
