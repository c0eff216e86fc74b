use super::decode::decode_event_line;
use super::logging::emit_stream_parse_error;
use crate::types::StreamEvent;

/// Splits a chunked response body into complete newline-terminated lines.
///
/// Bytes are buffered before decoding, so a multi-byte character that straddles
/// two chunks still decodes intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Ends the stream. Returns the unterminated trailing fragment, if any; it is
    /// never a deliverable line.
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buffer).into_owned())
        }
    }
}

/// Line framer plus event decoder for one chat response body.
#[derive(Debug, Default)]
pub struct StreamParser {
    framer: LineFramer,
    malformed_lines: usize,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns the events it completed, in arrival order.
    /// Corrupt lines are logged and skipped; unknown event kinds are dropped.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for line in self.framer.push(chunk) {
            match decode_event_line(&line) {
                Ok(Some(StreamEvent::Unknown)) | Ok(None) => {}
                Ok(Some(event)) => events.push(event),
                Err(error) => {
                    self.malformed_lines += 1;
                    emit_stream_parse_error(&error);
                }
            }
        }
        events
    }

    /// Number of lines skipped because they failed to decode.
    pub fn malformed_lines(&self) -> usize {
        self.malformed_lines
    }

    pub fn finish(self) -> Option<String> {
        self.framer.finish()
    }
}
