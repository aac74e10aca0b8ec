//! Session output processing.
//!
//! Raw PTY bytes are stripped of ANSI escape sequences with a VTE
//! parser, then scanned for line boundaries and the per-session prompt
//! marker that signals job completion.

use vte::{Params, Parser, Perform};

/// Longest partial line buffered while waiting for a terminator.
/// Beyond this the head is flushed as a line so a session printing a
/// long run with no newline (a `\r`-driven progress bar, say) cannot
/// grow the buffer without bound.
const MAX_PENDING: usize = 8192;

/// Strip ANSI escape codes from a self-contained byte sequence.
///
/// Returns clean UTF-8 text with all control sequences removed.
/// Newlines, carriage returns and tabs are preserved. For chunked
/// streams use [`OutputScanner`], which keeps parser state across
/// chunk boundaries.
pub fn strip_ansi(input: &[u8]) -> String {
    let mut extractor = PlainTextExtractor::new();
    let mut parser = Parser::new();

    parser.advance(&mut extractor, input);

    extractor.into_string()
}

/// VTE performer that extracts plain text.
struct PlainTextExtractor {
    output: Vec<u8>,
}

impl PlainTextExtractor {
    fn new() -> Self {
        Self { output: Vec::new() }
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Drain the text accumulated so far.
    fn take(&mut self) -> String {
        let bytes = std::mem::take(&mut self.output);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Perform for PlainTextExtractor {
    fn print(&mut self, c: char) {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        self.output.extend_from_slice(encoded.as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x0A | 0x0D | 0x09 => self.output.push(byte),
            _ => {}
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}

/// An item recognized in a session's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A complete output line, without its terminator.
    Line(String),
    /// The session's prompt marker: the in-flight job finished.
    Prompt,
}

/// Incremental scanner over one session's output stream.
///
/// Bytes arrive in arbitrary chunks; the scanner buffers partial lines
/// and partial markers across calls, so a marker split over two reads
/// is still recognized. The VTE parser is held for the stream's
/// lifetime, so an escape sequence split across reads is stripped the
/// same as one arriving whole.
pub struct OutputScanner {
    buf: String,
    marker: String,
    parser: Parser,
    extractor: PlainTextExtractor,
}

impl OutputScanner {
    /// Create a scanner recognizing the given prompt marker.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            buf: String::new(),
            marker: marker.into(),
            parser: Parser::new(),
            extractor: PlainTextExtractor::new(),
        }
    }

    /// Replace the prompt marker and discard any buffered partial
    /// state (used after `:reset_prompt`).
    pub fn set_marker(&mut self, marker: impl Into<String>) {
        self.marker = marker.into();
        self.buf.clear();
        self.parser = Parser::new();
        self.extractor = PlainTextExtractor::new();
    }

    /// Feed raw bytes, returning the events they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ScanEvent> {
        self.parser.advance(&mut self.extractor, bytes);
        self.buf.push_str(&self.extractor.take());

        let mut events = Vec::new();
        loop {
            let marker_pos = self.buf.find(&self.marker);
            let newline_pos = self.buf.find('\n');

            match (marker_pos, newline_pos) {
                // Marker with no earlier newline: the prompt is back.
                (Some(m), n) if n.map_or(true, |n| m < n) => {
                    let head = self.buf[..m].trim_end_matches('\r').to_string();
                    if !head.is_empty() {
                        events.push(ScanEvent::Line(head));
                    }
                    self.buf.drain(..m + self.marker.len());
                    events.push(ScanEvent::Prompt);
                }
                // A complete line before any marker.
                (_, Some(n)) => {
                    let line: String = self.buf.drain(..=n).collect();
                    let line = line.trim_end_matches(['\n', '\r']);
                    events.push(ScanEvent::Line(line.to_string()));
                }
                // Nothing complete yet.
                (_, None) => break,
            }
        }

        // Flush an oversized partial line, keeping enough tail that a
        // marker split across the cut is still found.
        if self.buf.len() > MAX_PENDING {
            let mut cut = self.buf.len() - self.marker.len().min(self.buf.len());
            while cut > 0 && !self.buf.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut > 0 {
                let head: String = self.buf.drain(..cut).collect();
                events.push(ScanEvent::Line(
                    head.trim_end_matches('\r').to_string(),
                ));
            }
        }
        events
    }
}
