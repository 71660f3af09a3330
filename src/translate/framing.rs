//! Frame decoding for vendor event streams.
//!
//! Vendors emit streaming responses as delimited records with a fixed event
//! marker in front of the payload (ERNIE: newline-delimited, `data: `
//! prefix). [`FrameSplitter`] is the strategy for cutting a byte stream
//! into payloads; a new vendor plugs in its own delimiter and prefix
//! length without touching the translator.

/// Incremental record splitter over an arbitrarily-chunked byte stream.
///
/// Records shorter than the prefix are dropped: blank keep-alive lines and
/// malformed fragments look the same at this layer and neither is worth
/// aborting a live stream over.
#[derive(Debug)]
pub struct FrameSplitter {
    delimiter: char,
    prefix_len: usize,
    buffer: String,
}

impl FrameSplitter {
    pub fn new(delimiter: char, prefix_len: usize) -> Self {
        Self {
            delimiter,
            prefix_len,
            buffer: String::new(),
        }
    }

    /// Splitter for newline-delimited records carrying the 6-byte
    /// `data: ` event marker.
    pub fn sse() -> Self {
        Self::new('\n', "data: ".len())
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
    }

    /// Pop the next complete payload, with the prefix stripped. Returns
    /// `None` once the buffered data holds no further complete record.
    pub fn next_frame(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.find(self.delimiter) {
            let record = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + self.delimiter.len_utf8());
            if let Some(payload) = strip_prefix(&record, self.prefix_len) {
                return Some(payload);
            }
        }
        None
    }

    /// Drain whatever remains after the upstream closed without a trailing
    /// delimiter; a final unterminated record is still a frame.
    pub fn finish(&mut self) -> Option<String> {
        let record = std::mem::take(&mut self.buffer);
        strip_prefix(&record, self.prefix_len)
    }
}

fn strip_prefix(record: &str, prefix_len: usize) -> Option<String> {
    if record.len() < prefix_len {
        return None;
    }
    // get() rather than indexing: a corrupt record may break the prefix
    // boundary mid-codepoint, and that is noise, not a panic.
    record.get(prefix_len..).map(str::to_string)
}
