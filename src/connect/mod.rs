//! Session transport.
//!
//! One [`Connection`] per session. The write side lives in the session
//! registry; the read side is pumped by a blocking task that forwards
//! raw output chunks to the dispatcher's event channel. Prompt
//! detection itself happens in the dispatcher, which scans the chunks
//! for the per-session marker.

use std::io::{Read, Write};

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::pty::{default_shell, LocalPty, PtyShell, PtySize};
use crate::session::SessionId;
use crate::Result;

/// Buffer size for reading PTY output.
const READ_BUFFER_SIZE: usize = 4096;

/// Event emitted by a session's reader task.
#[derive(Debug)]
pub enum SessionEvent {
    /// Raw output bytes from the session.
    Output(Vec<u8>),
    /// The session's output stream closed (process exit or channel break).
    Closed,
}

/// Write side of a managed child connection.
pub trait Connection: Send {
    /// Send one command line, terminated for us.
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Send raw bytes immediately, bypassing line discipline.
    ///
    /// Used for control characters (`:send_ctrl`) and prompt priming.
    fn send_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Whether the underlying process is still running.
    fn is_alive(&mut self) -> bool;

    /// Close the connection, terminating the child if needed.
    fn close(&mut self);
}

/// Per-session prompt marker.
///
/// The marker is stored in two halves and assembled in the PS1
/// assignment as two adjacent quoted strings, so the echoed setup line
/// never contains the literal marker and cannot be mistaken for a
/// prompt.
#[derive(Debug, Clone)]
pub struct PromptMarker {
    left: String,
    right: String,
}

impl PromptMarker {
    /// Generate a marker unique to this session.
    pub fn generate(id: SessionId) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Self {
            left: format!("[MSH{:x}", id.as_u64()),
            right: format!("{:x}]", nanos & 0xffff_ffff),
        }
    }

    /// The full marker text the scanner looks for.
    pub fn text(&self) -> String {
        format!("{}{}", self.left, self.right)
    }

    /// Shell line that silences echo and installs the marker prompt.
    ///
    /// Sent after open and again by `:reset_prompt` when a session's
    /// remote state desynchronized.
    pub fn setup_line(&self) -> String {
        format!(
            "stty -echo 2>/dev/null; unset HISTFILE PROMPT_COMMAND 2>/dev/null; \
             PS2=''; PS1='{}''{}'\n",
            self.left, self.right
        )
    }
}

/// Open a connection for the given host spec.
///
/// `localhost` (and `local`) spawn the platform default shell; any
/// other spec is launched as `ssh -tt <spec>` under a local PTY. The
/// read side is handed to a blocking reader task that forwards chunks
/// to `events`.
pub fn open(
    host_spec: &str,
    id: SessionId,
    events: mpsc::Sender<(SessionId, SessionEvent)>,
) -> Result<Box<dyn Connection>> {
    let pty = LocalPty::new();
    let mut shell = if is_local(host_spec) {
        pty.spawn(default_shell(), &[], PtySize::default())?
    } else {
        pty.spawn(
            "ssh",
            &["-tt".to_string(), host_spec.to_string()],
            PtySize::default(),
        )?
    };

    let writer = shell.take_writer()?;
    let reader = shell.take_reader()?;
    spawn_reader(id, reader, events);

    debug!("opened connection {} for {}", id, host_spec);

    Ok(Box::new(PtyConnection {
        shell,
        writer,
        closed: false,
    }))
}

fn is_local(host_spec: &str) -> bool {
    matches!(host_spec, "localhost" | "local" | "127.0.0.1")
}

/// Pump PTY output into the dispatcher's event channel.
///
/// Runs on the blocking pool; exits on EOF, EIO (PTY slave closed) or
/// a dropped receiver, always sending a final `Closed` event.
fn spawn_reader(
    id: SessionId,
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::Sender<(SessionId, SessionEvent)>,
) {
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("reader {}: EOF", id);
                    break;
                }
                Ok(n) => {
                    trace!("reader {}: read {} bytes", id, n);
                    if tx
                        .blocking_send((id, SessionEvent::Output(buf[..n].to_vec())))
                        .is_err()
                    {
                        debug!("reader {}: channel closed", id);
                        return;
                    }
                }
                Err(e) => {
                    // EIO on Unix typically means the PTY slave was closed
                    #[cfg(unix)]
                    if e.raw_os_error() == Some(libc::EIO) {
                        debug!("reader {}: PTY closed (EIO)", id);
                        break;
                    }

                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        debug!("reader {}: broken pipe", id);
                        break;
                    }

                    error!("reader {} error: {}", id, e);
                    break;
                }
            }
        }

        let _ = tx.blocking_send((id, SessionEvent::Closed));
    });
}

/// Connection backed by a local PTY child process.
struct PtyConnection {
    shell: PtyShell,
    writer: Box<dyn Write + Send>,
    closed: bool,
}

impl Connection for PtyConnection {
    fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        !self.closed && self.shell.is_alive()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.shell.kill();
        }
    }
}
