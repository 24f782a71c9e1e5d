//! Ctrl+C handling for graceful shutdown.
//!
//! A [`ShutdownHandler`] wraps an `Arc<AtomicBool>` that the digesting
//! pipeline checks before starting each file. Pressing Ctrl+C sets the flag:
//! files already being read finish, nothing new is started, and the run
//! reports itself as interrupted (exit code 130).
//!
//! # Usage
//!
//! ```rust,no_run
//! use hashmatch::duplicates::FinderConfig;
//! use hashmatch::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Exit code for SIGINT (128 + 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown programmatically.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone the underlying flag for worker configuration.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: Mutex<Option<ShutdownHandler>> = Mutex::new(None);

/// Install the process-wide Ctrl+C handler.
///
/// Safe to call more than once: later calls reset and return the handler
/// installed first.
///
/// # Errors
///
/// Returns [`SignalError`] if the OS handler cannot be registered.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    // Held across registration so the stored flag is the one ctrlc sets.
    let mut global = GLOBAL_HANDLER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ref handler) = *global {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing files in progress...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });

    match installed {
        Ok(()) => {}
        Err(ctrlc::Error::MultipleHandlers) => {
            // Someone outside this module owns the OS handler.
            log::warn!("Ctrl+C handler already registered elsewhere; interrupts may not stop the scan");
        }
        Err(e) => return Err(SignalError::InstallFailed(e)),
    }

    *global = Some(handler.clone());
    Ok(handler)
}
