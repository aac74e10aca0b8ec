//! Shared fixtures for integration tests: a scripted connection and a
//! readable output sink, wired into a dispatcher.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use multish::connect::{Connection, SessionEvent};
use multish::logging::DebugToggle;
use multish::{Dispatcher, MultishError, SessionId, ShellSession};

/// Connection that records everything written to it and can be
/// switched to a failing state to model a broken channel.
pub struct TestConnection {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    alive: Arc<Mutex<bool>>,
}

impl TestConnection {
    pub fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Mutex<bool>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let alive = Arc::new(Mutex::new(true));
        (
            Self {
                sent: Arc::clone(&sent),
                alive: Arc::clone(&alive),
            },
            sent,
            alive,
        )
    }
}

impl Connection for TestConnection {
    fn send_line(&mut self, line: &str) -> multish::Result<()> {
        if !*self.alive.lock().unwrap() {
            return Err(MultishError::Pty("channel broken".into()));
        }
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.sent.lock().unwrap().push(bytes);
        Ok(())
    }

    fn send_raw(&mut self, bytes: &[u8]) -> multish::Result<()> {
        if !*self.alive.lock().unwrap() {
            return Err(MultishError::Pty("channel broken".into()));
        }
        self.sent.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        *self.alive.lock().unwrap()
    }

    fn close(&mut self) {
        *self.alive.lock().unwrap() = false;
    }
}

/// Write sink the test can read back while the dispatcher owns it.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Dispatcher with a readable sink and a parked event receiver.
pub struct Fixture {
    pub dispatcher: Dispatcher<SharedBuf>,
    pub out: SharedBuf,
    _events_rx: mpsc::Receiver<(SessionId, SessionEvent)>,
}

impl Fixture {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(64);
        let out = SharedBuf::default();
        Self {
            dispatcher: Dispatcher::new(out.clone(), tx, DebugToggle::detached()),
            out,
            _events_rx: rx,
        }
    }

    /// Register a session with a scripted connection under `host`.
    pub fn add_session(
        &mut self,
        host: &str,
    ) -> (SessionId, Arc<Mutex<Vec<Vec<u8>>>>, Arc<Mutex<bool>>) {
        let (conn, sent, alive) = TestConnection::new();
        let session = ShellSession::new(SessionId::new(), host, Box::new(conn));
        let id = self.dispatcher.group_mut().add(session);
        (id, sent, alive)
    }
}
