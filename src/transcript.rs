//! Toggled transcript sink.
//!
//! When enabled, every submitted line is appended as `> <line>` and
//! every displayed output line verbatim, in order. Enabling an
//! existing file appends; nothing ever truncates. `:hide_password`
//! sets the redacted flag, which keeps the sink off until logging is
//! explicitly re-enabled with a path.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

/// Append-mode transcript logger.
#[derive(Debug, Default)]
pub struct Transcript {
    file: Option<File>,
    path: Option<PathBuf>,
    redacted: bool,
}

impl Transcript {
    /// Create a disabled transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether events are currently being written.
    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Whether `:hide_password` forced logging off.
    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    /// The path events are written to, if enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Start appending to `path`, creating it if missing.
    /// Clears the redacted flag.
    pub fn enable(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let file = OpenOptions::new().append(true).create(true).open(&path)?;
        self.file = Some(file);
        self.path = Some(path);
        self.redacted = false;
        Ok(())
    }

    /// Stop writing; the file is left as-is for later appending.
    pub fn disable(&mut self) {
        self.file = None;
        self.path = None;
    }

    /// Force logging off ahead of a sensitive input line.
    pub fn redact(&mut self) {
        self.disable();
        self.redacted = true;
    }

    /// Record a submitted input line.
    pub fn log_input(&mut self, line: &str) {
        self.write_line(&format!("> {}", line));
    }

    /// Record a displayed output line, tags included.
    pub fn log_output(&mut self, line: &str) {
        self.write_line(line);
    }

    fn write_line(&mut self, line: &str) {
        if let Some(file) = &mut self.file {
            // A failing transcript write must not disturb dispatch.
            let _ = writeln!(file, "{}", line);
            let _ = file.flush();
        }
    }
}
