//! Session management module.
//!
//! A [`ShellSession`] is one managed child connection plus its state;
//! the [`ShellGroup`] is the insertion-ordered registry owning all of
//! them. Membership and liveness operations live on the group.

mod group;
mod id;
pub(crate) mod shell;
mod state;

pub use group::{GroupCounts, Resolved, ShellGroup};
pub use id::SessionId;
pub use shell::ShellSession;
pub use state::SessionState;
