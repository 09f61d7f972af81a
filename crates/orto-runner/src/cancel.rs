//! Cooperative cancellation.

use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared stop request, checked between tiles and between chart blocks.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag set by Ctrl-C. Work in progress finishes its current tile or
    /// block and then stops.
    pub fn install_ctrlc_handler() -> Result<Self> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            if handler_flag.is_cancelled() {
                tracing::warn!("Second interrupt, exiting immediately");
                std::process::exit(130);
            }
            tracing::warn!("Interrupt received, stopping after the current unit of work");
            handler_flag.cancel();
        })?;
        Ok(flag)
    }

    /// Request a stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
