//! Mock key listener for unit and integration tests.
//!
//! Records how often the capture attached and detached, so tests can check
//! the listener is always released when a recording ends.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use super::{CaptureError, KeyListener};

/// A [`KeyListener`] that only counts calls.
///
/// Clones share their counters: keep one clone in the test and hand the other
/// to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockKeyListener {
    attached: Arc<AtomicBool>,
    attach_count: Arc<AtomicU32>,
    detach_count: Arc<AtomicU32>,
    fail_attach: Arc<AtomicBool>,
}

impl MockKeyListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later [`attach`](KeyListener::attach) fail.
    pub fn fail_attach(&self) {
        self.fail_attach.store(true, Ordering::SeqCst);
    }

    pub fn attach_count(&self) -> u32 {
        self.attach_count.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> u32 {
        self.detach_count.load(Ordering::SeqCst)
    }
}

impl KeyListener for MockKeyListener {
    fn attach(&mut self) -> Result<(), CaptureError> {
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(CaptureError::SubscribeFailed("mock refused".to_string()));
        }
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        self.attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        self.attached.store(false, Ordering::SeqCst);
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_key_listener_counts_are_shared_between_clones() {
        // Arrange
        let probe = MockKeyListener::new();
        let mut listener = probe.clone();

        // Act
        listener.attach().unwrap();
        listener.detach();

        // Assert
        assert_eq!(probe.attach_count(), 1);
        assert_eq!(probe.detach_count(), 1);
        assert!(!probe.is_attached());
    }

    #[test]
    fn test_mock_key_listener_fail_attach_leaves_it_detached() {
        let probe = MockKeyListener::new();
        let mut listener = probe.clone();
        probe.fail_attach();

        let result = listener.attach();

        assert!(matches!(result, Err(CaptureError::SubscribeFailed(_))));
        assert!(!probe.is_attached());
        assert_eq!(probe.attach_count(), 0);
    }
}
