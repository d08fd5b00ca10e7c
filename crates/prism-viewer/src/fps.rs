use std::time::{Duration, Instant};

/// Frames-per-second over fixed reporting windows.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    start: Option<Instant>,
    frames: u32,
}

impl FpsCounter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            start: None,
            frames: 0,
        }
    }

    /// Counts one frame; returns the rate once per elapsed window.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let start = *self.start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window {
            return None;
        }

        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        self.start = Some(now);
        self.frames = 0;
        Some(fps)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_once_per_window() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::default();

        assert_eq!(fps.tick(t0), None);
        for i in 1..60 {
            assert_eq!(fps.tick(t0 + Duration::from_millis(i * 16)), None);
        }
        let rate = fps.tick(t0 + Duration::from_secs(1)).unwrap();
        assert!((rate - 61.0).abs() < 1e-9, "{rate}");

        // Next window starts fresh.
        assert_eq!(fps.tick(t0 + Duration::from_millis(1500)), None);
    }
}
