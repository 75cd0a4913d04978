//! Cooperative cancellation (spec §5): a token a caller can set from
//! another thread, checked once per decoded unit inside every decode loop
//! (once per line for line formats, once per TS packet, once per MXF KLV
//! unit). Suspensions never occur mid-unit, so a cancelled pipeline always
//! stops cleanly between units rather than inside one.

use crate::error::{OpxError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cheaply cloneable; every clone observes the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The suspension-point check itself: a no-op until cancelled, then
    /// `Err(OpxError::Cancelled)` forever after.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(OpxError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_is_ok_until_cancelled() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(matches!(token.check(), Err(OpxError::Cancelled)));
    }

    #[test]
    fn clones_share_the_same_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
