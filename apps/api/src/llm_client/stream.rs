//! Incremental aggregation of the model server's newline-delimited JSON stream.
//!
//! The server answers `/api/generate` with one JSON object per line, each
//! optionally carrying a `response` text fragment. Chunks from the transport do
//! not respect line boundaries, so partial lines are buffered until their `\n`
//! arrives (or the stream ends).

use bytes::BytesMut;
use serde::Deserialize;

use super::LlmError;

/// One decoded line of the generation stream. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct StreamLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default)]
pub struct StreamAggregator {
    pending: BytesMut,
    /// Prefix of `pending` already known to hold no `\n`.
    scanned: usize,
    output: String,
    lines_seen: usize,
    fragments: usize,
    done: bool,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a raw body chunk. Every complete line in the buffer is decoded
    /// immediately; a trailing partial line waits for the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), LlmError> {
        self.pending.extend_from_slice(chunk);

        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            let mut line = self.pending.split_to(pos + 1);
            line.truncate(pos);
            self.scanned = 0;
            self.process_line(&line)?;
        }
        self.scanned = self.pending.len();

        Ok(())
    }

    /// Number of `response` fragments appended so far.
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Whether the server has sent its `"done": true` marker.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Processes any unterminated final line and returns the trimmed text.
    pub fn finish(mut self) -> Result<String, LlmError> {
        if !self.pending.is_empty() {
            let rest = self.pending.split();
            self.process_line(&rest)?;
        }
        Ok(self.output.trim().to_string())
    }

    fn process_line(&mut self, raw: &[u8]) -> Result<(), LlmError> {
        self.lines_seen += 1;
        let line_no = self.lines_seen;

        let text = std::str::from_utf8(raw).map_err(|e| LlmError::ResponseFormat {
            line: line_no,
            message: format!("invalid UTF-8: {e}"),
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let decoded: StreamLine =
            serde_json::from_str(text).map_err(|e| LlmError::ResponseFormat {
                line: line_no,
                message: e.to_string(),
            })?;

        if let Some(error) = decoded.error {
            return Err(LlmError::Communication(format!(
                "model server reported an error: {error}"
            )));
        }

        if let Some(fragment) = decoded.response {
            self.output.push_str(&fragment);
            self.fragments += 1;
        }

        if decoded.done {
            self.done = true;
        }

        Ok(())
    }
}
