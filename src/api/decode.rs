use crate::types::StreamEvent;
use serde_json::Value;
use thiserror::Error;

/// A complete line that could not be turned into a [`StreamEvent`].
#[derive(Debug, Error)]
pub enum LineDecodeError {
    #[error("stream line is not valid JSON: {source}")]
    Syntax {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stream event '{event_type}' has unexpected fields: {source}")]
    Shape {
        event_type: String,
        line: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LineDecodeError {
    pub fn line(&self) -> &str {
        match self {
            LineDecodeError::Syntax { line, .. } | LineDecodeError::Shape { line, .. } => line,
        }
    }
}

/// Decodes one complete protocol line.
///
/// Blank lines produce `Ok(None)`. Records whose `type` is missing or not
/// recognised decode to [`StreamEvent::Unknown`] so callers can skip them
/// without treating them as corrupt.
pub fn decode_event_line(line: &str) -> Result<Option<StreamEvent>, LineDecodeError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|source| LineDecodeError::Syntax {
            line: trimmed.to_string(),
            source,
        })?;

    let Some(event_type) = value.get("type").and_then(Value::as_str) else {
        return Ok(Some(StreamEvent::Unknown));
    };
    let event_type = event_type.to_string();

    match serde_json::from_value::<StreamEvent>(value) {
        Ok(event) => Ok(Some(event)),
        Err(source) => Err(LineDecodeError::Shape {
            event_type,
            line: trimmed.to_string(),
            source,
        }),
    }
}
