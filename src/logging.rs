//! Logging initialization and runtime verbosity control.
//!
//! The `:set_debug` control command flips the subscriber between the
//! info and debug levels at runtime, so initialization hands back a
//! reload handle wrapped in [`DebugToggle`].

use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Filter applied when debugging is off.
const QUIET_FILTER: &str = "multish=info";
/// Filter applied when debugging is on.
const VERBOSE_FILTER: &str = "multish=debug";

/// Handle for toggling verbose tracing at runtime.
pub struct DebugToggle {
    handle: Option<reload::Handle<EnvFilter, Registry>>,
    enabled: bool,
}

impl DebugToggle {
    /// A toggle that tracks state but controls no subscriber.
    ///
    /// Used in tests and when another subscriber is already installed.
    pub fn detached() -> Self {
        Self {
            handle: None,
            enabled: false,
        }
    }

    /// Whether verbose tracing is currently on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch verbose tracing on or off.
    pub fn set(&mut self, enabled: bool) {
        self.enabled = enabled;
        if let Some(handle) = &self.handle {
            let filter = if enabled { VERBOSE_FILTER } else { QUIET_FILTER };
            let _ = handle.reload(EnvFilter::new(filter));
        }
    }
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `multish=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() -> DebugToggle {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET_FILTER));
    let (layer, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(layer)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    DebugToggle {
        handle: Some(handle),
        enabled: false,
    }
}

/// Try to initialize the logging system.
///
/// Returns a detached toggle if logging has already been initialized.
pub fn try_init() -> DebugToggle {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(QUIET_FILTER));
    let (layer, handle) = reload::Layer::new(filter);

    let result = tracing_subscriber::registry()
        .with(layer)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();

    match result {
        Ok(()) => DebugToggle {
            handle: Some(handle),
            enabled: false,
        },
        Err(_) => DebugToggle::detached(),
    }
}
