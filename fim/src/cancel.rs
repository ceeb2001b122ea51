use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MineError, Result};

/// Shared abort flag polled at every recursion entry.
///
/// Clones observe the same flag, so a handle can be given to another
/// thread (or a signal handler) while the miner holds its own.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Returns `Err(MineError::Aborted)` once the token has been cancelled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MineError::Aborted)
        } else {
            Ok(())
        }
    }
}
