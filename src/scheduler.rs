use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::error;

/// Failure flag shared by every emission of one build-file generation run.
///
/// Emissions may run on several threads; the first recorded error wins and
/// later ones only bump the count.
#[derive(Debug, Default)]
pub struct FailureState {
    failed: AtomicBool,
    first_error: OnceLock<String>,
    count: AtomicUsize,
}

impl FailureState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.count.fetch_add(1, Ordering::Relaxed);
        if self
            .failed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.first_error.set(message);
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// The first recorded message. May briefly be `None` on another thread
    /// right after `is_failed` turns true.
    pub fn first_error(&self) -> Option<&str> {
        self.first_error.get().map(String::as_str)
    }

    pub fn error_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_failure_wins() {
        let state = FailureState::new();
        assert!(!state.is_failed());
        assert_eq!(state.first_error(), None);

        state.record("first");
        state.record("second");
        assert!(state.is_failed());
        assert_eq!(state.first_error(), Some("first"));
        assert_eq!(state.error_count(), 2);
    }

    #[test]
    fn test_concurrent_records() {
        let state = FailureState::new();
        thread::scope(|s| {
            for i in 0..8 {
                let state = &state;
                s.spawn(move || state.record(format!("error {i}")));
            }
        });
        assert!(state.is_failed());
        assert_eq!(state.error_count(), 8);
        assert!(state.first_error().unwrap().starts_with("error "));
    }
}
