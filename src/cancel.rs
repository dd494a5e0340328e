//! Cooperative cancellation
//!
//! Long-running work (line-by-line parsing, whole-graph merge passes) polls a
//! [`CancellationToken`] between independent work items. Cancellation is
//! never observed in the middle of a mutation.

use crate::error::{AsmGraphError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag; clones observe the same flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; may be called from any thread
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with [`AsmGraphError::Cancelled`] if cancellation was requested
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(AsmGraphError::Cancelled)
        } else {
            Ok(())
        }
    }
}
