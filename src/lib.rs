//! # multish
//!
//! Interactive controller that fans one terminal's commands out to a
//! group of child shell sessions over local PTYs or `ssh`.
//!
//! Typed lines are broadcast to every active session and each
//! session's output is relayed back, tagged with the session name.
//! Lines starting with `:` drive a control interface for membership,
//! liveness and signal delivery; `!` runs a command locally and `#`
//! is a comment. Job completion is tracked by planting a unique
//! prompt marker in each child shell and scanning its output stream
//! for it, which drives the `ready`/`waiting` prompt.
//!
//! ## Quick start
//!
//! ```no_run
//! use multish::connect::SessionEvent;
//! use multish::{Dispatcher, SessionId};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let debug = multish::logging::try_init();
//!     let (tx, mut rx) = mpsc::channel::<(SessionId, SessionEvent)>(256);
//!     let mut dispatcher = Dispatcher::new(std::io::stdout(), tx, debug);
//!
//!     dispatcher.add_host("localhost");
//!     dispatcher.handle_line("uname -a");
//!     while let Some((id, event)) = rx.recv().await {
//!         dispatcher.handle_event(id, event);
//!         if dispatcher.prompt().starts_with("ready") {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod cli;
pub mod complete;
pub mod connect;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod output;
pub mod pattern;
pub mod pty;
pub mod session;
pub mod transcript;

// Re-export commonly used types
pub use dispatch::Dispatcher;
pub use error::{MultishError, Result};
pub use session::{SessionId, SessionState, ShellGroup, ShellSession};
