//! Incremental line splitting.

use std::fmt;
use std::sync::Arc;

/// Callback invoked once per output line.
pub type LineHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Splits an arbitrarily chunked byte stream into lines.
///
/// Each `\n` terminates one line. Lines are handed to the callback with the
/// terminator removed and trailing whitespace (including `\r`) trimmed.
pub struct LineSplitter {
    handler: LineHandler,
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Create a splitter delivering lines to `handler`.
    pub fn new(handler: LineHandler) -> Self {
        Self {
            handler,
            pending: Vec::new(),
        }
    }

    /// Feed the next chunk of the stream.
    pub fn feed(&mut self, chunk: &[u8]) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            self.emit();
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
    }

    /// Flush an unterminated final line, if any.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() {
            self.emit();
        }
    }

    fn emit(&mut self) {
        let line = String::from_utf8_lossy(&self.pending);
        (self.handler)(line.trim_end());
        self.pending.clear();
    }
}

impl fmt::Debug for LineSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSplitter")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
