use std::time::{Duration, Instant};

/// Elapsed wall-clock time as a looping value for shader animation.
///
/// Wraps every [`ShaderClock::PERIOD`] so the `f32` handed to shaders keeps
/// sub-millisecond precision no matter how long the process runs.
#[derive(Debug, Clone)]
pub struct ShaderClock {
    start: Instant,
}

impl ShaderClock {
    pub const PERIOD: Duration = Duration::from_secs(10_000);

    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self { start }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    /// Looping seconds in `[0, 10000)` at `now`.
    pub fn elapsed_at(&self, now: Instant) -> f32 {
        Self::wrap(now.saturating_duration_since(self.start))
    }

    /// Reduces a duration modulo [`ShaderClock::PERIOD`], at microsecond
    /// resolution.
    pub fn wrap(elapsed: Duration) -> f32 {
        let micros = elapsed.as_micros() % Self::PERIOD.as_micros();
        (micros as f64 / 1_000_000.0) as f32
    }
}

impl Default for ShaderClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_every_ten_thousand_seconds() {
        assert_eq!(ShaderClock::wrap(Duration::ZERO), 0.0);
        assert_eq!(ShaderClock::wrap(Duration::from_millis(1_500)), 1.5);
        assert_eq!(ShaderClock::wrap(Duration::from_secs(10_000)), 0.0);
        assert_eq!(ShaderClock::wrap(Duration::from_secs(10_002)), 2.0);
        assert!(ShaderClock::wrap(Duration::from_secs(9_999)) < 10_000.0);
    }

    #[test]
    fn submicrosecond_time_is_truncated() {
        assert_eq!(ShaderClock::wrap(Duration::from_nanos(999)), 0.0);
    }

    #[test]
    fn elapsed_is_relative_to_start() {
        let start = Instant::now();
        let clock = ShaderClock::starting_at(start);
        assert_eq!(clock.elapsed_at(start + Duration::from_secs(3)), 3.0);
    }
}
