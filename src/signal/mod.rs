//! Cooperative abort for model builds (SIGINT/SIGTERM)
//!
//! A build session holds an `AbortSignal`; the pipeline checks it between
//! chain levels and between stages. The CLI trips it from a signal handler:
//! 1. First signal: request abort; the running build stops at its next check
//! 2. Second signal: exit immediately with `EXIT_CODE_ABORTED`

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Exit code for aborted builds
pub const EXIT_CODE_ABORTED: i32 = 130;

/// Returned by an abort check once abort has been requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("build aborted")]
pub struct Aborted;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    requested: Arc<AtomicBool>,
    signal_count: Arc<AtomicU8>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort without counting as a signal.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// `Err(Aborted)` once abort has been requested.
    pub fn check(&self) -> Result<(), Aborted> {
        if self.is_requested() {
            Err(Aborted)
        } else {
            Ok(())
        }
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Handle a signal (SIGINT/SIGTERM)
    ///
    /// Returns the action to take
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.signal_count.fetch_add(1, Ordering::SeqCst);
        match count {
            0 => {
                self.request();
                SignalAction::Abort
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }

    /// Clear the flag so the signal can serve another build
    pub fn reset(&self) {
        self.requested.store(false, Ordering::SeqCst);
        self.signal_count.store(0, Ordering::SeqCst);
    }

    /// Install SIGINT/SIGTERM handlers that trip this signal.
    ///
    /// Must be called at most once per process.
    pub fn install_handler(&self) -> Result<(), ctrlc::Error> {
        let signal = self.clone();
        ctrlc::set_handler(move || match signal.handle_signal() {
            SignalAction::Abort => {
                tracing::warn!("received interrupt, aborting build at the next checkpoint");
            }
            SignalAction::ImmediateExit => {
                tracing::warn!("received second interrupt, exiting immediately");
                std::process::exit(EXIT_CODE_ABORTED);
            }
            SignalAction::Ignore => {}
        })
    }
}

/// Action to take after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: abort at the next checkpoint
    Abort,
    /// Second signal: exit now
    ImmediateExit,
    /// Third+ signal: ignore
    Ignore,
}
