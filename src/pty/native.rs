//! Native PTY implementation using portable-pty.

use portable_pty::{native_pty_system, CommandBuilder, PtySize as NativePtySize};
use std::io::{Read, Write};

use super::PtySize;
use crate::error::MultishError;
use crate::Result;

/// Get the default shell for the current platform.
pub fn default_shell() -> &'static str {
    #[cfg(unix)]
    {
        std::env::var("SHELL")
            .ok()
            .map(|s| Box::leak(s.into_boxed_str()) as &'static str)
            .unwrap_or("/bin/sh")
    }
    #[cfg(windows)]
    {
        "powershell.exe"
    }
}

/// Wrapper around the native PTY system.
pub struct LocalPty {
    pty_system: Box<dyn portable_pty::PtySystem + Send>,
}

impl LocalPty {
    /// Create a new LocalPty instance.
    pub fn new() -> Self {
        Self {
            pty_system: native_pty_system(),
        }
    }

    /// Spawn a program with arguments in a new PTY.
    ///
    /// `TERM` is forced to `dumb` so the child shell emits no escape
    /// sequences the dispatcher would have to strip.
    pub fn spawn(&self, program: &str, args: &[String], size: PtySize) -> Result<PtyShell> {
        let native_size = NativePtySize {
            rows: size.rows,
            cols: size.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = self
            .pty_system
            .openpty(native_size)
            .map_err(|e| MultishError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        for arg in args {
            cmd.arg(arg);
        }
        cmd.env("TERM", "dumb");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| MultishError::Pty(e.to_string()))?;

        Ok(PtyShell {
            master: pair.master,
            child,
        })
    }
}

impl Default for LocalPty {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned child process with its PTY master side.
pub struct PtyShell {
    master: Box<dyn portable_pty::MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
}

impl PtyShell {
    /// Take the writer (can only be called once).
    pub fn take_writer(&mut self) -> Result<Box<dyn Write + Send>> {
        self.master
            .take_writer()
            .map_err(|e| MultishError::Pty(e.to_string()))
    }

    /// Clone a reader for the child's output.
    pub fn take_reader(&mut self) -> Result<Box<dyn Read + Send>> {
        self.master
            .try_clone_reader()
            .map_err(|e| MultishError::Pty(e.to_string()))
    }

    /// Check whether the child is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Terminate the child process, ignoring already-exited children.
    pub fn kill(&mut self) {
        let _ = self.child.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell() {
        let shell = default_shell();
        assert!(!shell.is_empty());

        #[cfg(unix)]
        {
            assert!(shell.starts_with('/') || !shell.contains('/'));
        }

        #[cfg(windows)]
        {
            assert!(shell.ends_with(".exe"));
        }
    }

    // Note: spawning tests are ignored by default because PTY operations
    // can block or fail in constrained CI environments.
    // Run with: cargo test -- --ignored
    #[test]
    #[ignore]
    #[cfg(unix)]
    fn test_spawn_shell() {
        let pty = LocalPty::new();
        let shell = pty.spawn("/bin/sh", &[], PtySize::default());
        assert!(shell.is_ok(), "Failed to spawn shell: {:?}", shell.err());

        let mut shell = shell.unwrap();
        assert!(shell.is_alive());
        shell.kill();
    }

    #[test]
    #[ignore]
    #[cfg(unix)]
    fn test_spawn_missing_program() {
        let pty = LocalPty::new();
        let shell = pty.spawn("/does/not/exist", &[], PtySize::default());
        // Either the spawn fails outright or the child dies immediately;
        // both are acceptable for a missing binary.
        if let Ok(mut shell) = shell {
            std::thread::sleep(std::time::Duration::from_millis(200));
            assert!(!shell.is_alive());
        }
    }
}
