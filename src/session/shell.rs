//! One managed child shell session.

use crate::connect::{Connection, PromptMarker};
use crate::error::MultishError;
use crate::output::{OutputScanner, ScanEvent};
use crate::Result;

use super::{SessionId, SessionState};

/// A single managed child connection plus its state.
///
/// The connection handle is exclusively owned; dropping or killing it
/// never affects other sessions in the group.
pub struct ShellSession {
    /// Stable identity, independent of renames.
    pub id: SessionId,
    /// Immutable origin spec the session was opened from.
    pub host_spec: String,
    /// Mutable display name (starts as the host spec).
    pub display_name: String,
    /// Disambiguating suffix when display names collide.
    pub index: Option<u32>,
    /// Membership/liveness state.
    pub state: SessionState,
    /// True between dispatch and this session's completion.
    pub pending_job: bool,
    /// Suppress output lines until the next prompt (set while priming).
    pub muted: bool,
    marker: PromptMarker,
    scanner: OutputScanner,
    conn: Option<Box<dyn Connection>>,
}

impl ShellSession {
    /// Create an Active session around an open connection.
    ///
    /// The id is allocated by the caller because the connection's
    /// reader task must already be tagged with it.
    pub fn new(id: SessionId, host_spec: impl Into<String>, conn: Box<dyn Connection>) -> Self {
        let host_spec = host_spec.into();
        let marker = PromptMarker::generate(id);
        let scanner = OutputScanner::new(marker.text());

        Self {
            id,
            display_name: host_spec.clone(),
            host_spec,
            index: None,
            state: SessionState::Active,
            pending_job: false,
            muted: false,
            marker,
            scanner,
            conn: Some(conn),
        }
    }

    /// The name shown in output tags and matched by patterns:
    /// `name` or `name#index`.
    pub fn rendered_name(&self) -> String {
        match self.index {
            Some(i) => format!("{}#{}", self.display_name, i),
            None => self.display_name.clone(),
        }
    }

    /// Send one command line; the session's job becomes pending.
    pub fn dispatch_line(&mut self, line: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.send_line(line)?;
        self.pending_job = true;
        Ok(())
    }

    /// Deliver raw bytes immediately, bypassing line dispatch.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let conn = self.connection()?;
        conn.send_raw(bytes)
    }

    /// Send the prompt-priming line and mute output until the marker
    /// comes back. Used right after open and by `:reset_prompt`.
    pub fn prime(&mut self) -> Result<()> {
        let setup = self.marker.setup_line();
        let conn = self.connection()?;
        conn.send_raw(setup.as_bytes())?;
        self.muted = true;
        self.pending_job = true;
        Ok(())
    }

    /// Feed raw output bytes through the session's scanner.
    pub fn scan(&mut self, bytes: &[u8]) -> Vec<ScanEvent> {
        self.scanner.push(bytes)
    }

    /// Mark the session dead, dropping its connection.
    pub fn mark_dead(&mut self) {
        self.state.transition_to(SessionState::Dead);
        self.pending_job = false;
        self.muted = false;
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
    }

    /// Attach a fresh connection after `:reconnect`; the session keeps
    /// its identity and marker, and must be primed again.
    pub fn attach(&mut self, conn: Box<dyn Connection>) {
        self.conn = Some(conn);
        self.state.transition_to(SessionState::Active);
        self.scanner.set_marker(self.marker.text());
        self.pending_job = false;
        self.muted = false;
    }

    /// Close the connection without changing state (controller exit).
    pub fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close();
        }
    }

    fn connection(&mut self) -> Result<&mut Box<dyn Connection>> {
        let name = self.rendered_name();
        self.conn
            .as_mut()
            .ok_or(MultishError::Connection(name))
    }
}

impl std::fmt::Debug for ShellSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellSession")
            .field("id", &self.id)
            .field("host_spec", &self.host_spec)
            .field("display_name", &self.display_name)
            .field("index", &self.index)
            .field("state", &self.state)
            .field("pending_job", &self.pending_job)
            .finish_non_exhaustive()
    }
}
