//! PTY (Pseudo-Terminal) abstraction layer.
//!
//! Platform-independent local transport for shell sessions. Each
//! session runs its child process (a local shell or an `ssh` client)
//! under its own PTY so interactive programs behave normally.

mod native;

pub use native::{default_shell, LocalPty, PtyShell};

/// Size of a PTY in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl PtySize {
    /// Create a new PtySize with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}
