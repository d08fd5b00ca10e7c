use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot pipeline reload request.
///
/// Any thread may raise it; the render loop consumes it once at the top of
/// the next frame. Requests raised before it is consumed collapse into one.
#[derive(Debug, Clone, Default)]
pub struct ReloadSignal {
    pending: Arc<AtomicBool>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns `true` at most once per batch of requests.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_collapse_into_one() {
        let signal = ReloadSignal::new();
        assert!(!signal.take());

        signal.request();
        signal.request();
        assert!(signal.is_pending());
        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn clones_share_the_slot() {
        let signal = ReloadSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.request())
            .join()
            .unwrap();
        assert!(signal.take());
    }
}
