use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Raised when a request-scoped [`CancelToken`] has been triggered.
#[derive(Debug, Error)]
#[error("operation canceled")]
pub struct Canceled;

/// Request-scoped cancellation flag, threaded through every component that
/// suspends on I/O. Cancellation is safe at any point: a draft that has not
/// been closed is reclaimed by its repository.
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

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Observation point: return `Canceled` if the request was canceled.
    pub fn check(&self) -> Result<(), Canceled> {
        if self.is_canceled() {
            Err(Canceled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let shared = token.clone();
        token.cancel();
        assert!(shared.is_canceled());
        assert!(shared.check().is_err());
    }
}
