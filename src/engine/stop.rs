// Stop signal - Process-wide "wrap up" flag shared by every voice thread

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set once by the coordinator, polled by voices at the top of each loop
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every voice to stop; returns false if a stop was already requested
    pub fn request_stop(&self) -> bool {
        !self.stopped.swap(true, Ordering::AcqRel)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_running() {
        assert!(!StopSignal::new().is_stopped());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let signal = StopSignal::new();
        let worker_view = signal.clone();

        assert!(signal.request_stop());
        assert!(worker_view.is_stopped());
    }

    #[test]
    fn test_second_request_is_reported() {
        let signal = StopSignal::new();
        assert!(signal.request_stop());
        assert!(!signal.request_stop());
        assert!(signal.is_stopped());
    }
}
