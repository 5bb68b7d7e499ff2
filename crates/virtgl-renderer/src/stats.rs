use std::time::{Duration, Instant};

/// Presentation counter producing periodic frames-per-second figures.
///
/// One instance lives inside the renderer and is ticked once per successful
/// present. When disabled, ticking only advances the total frame count.
#[derive(Debug, Clone)]
pub struct FrameStats {
    enabled: bool,
    interval: Duration,
    window_start: Option<Instant>,
    window_frames: u32,
    total_frames: u64,
}

impl FrameStats {
    pub fn new(enabled: bool, interval: Duration) -> Self {
        Self {
            enabled,
            interval,
            window_start: None,
            window_frames: 0,
            total_frames: 0,
        }
    }

    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Counts one presented frame at `now`.
    ///
    /// Returns the averaged FPS when the current window exceeds the interval;
    /// the window then restarts at `now`.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.total_frames = self.total_frames.wrapping_add(1);
        if !self.enabled {
            return None;
        }

        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.window_frames = 0;
            return None;
        };

        self.window_frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed <= self.interval {
            return None;
        }

        let fps = self.window_frames as f32 / elapsed.as_secs_f32();
        self.window_start = Some(now);
        self.window_frames = 0;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn disabled_only_counts() {
        let mut stats = FrameStats::new(false, Duration::from_secs(1));
        let t0 = Instant::now();
        for i in 0..5 {
            assert!(stats.tick(t0 + Duration::from_secs(i)).is_none());
        }
        assert_eq!(stats.total_frames(), 5);
    }

    #[test]
    fn reports_after_interval() {
        let mut stats = FrameStats::new(true, Duration::from_secs(1));
        let t0 = Instant::now();
        assert!(stats.tick(t0).is_none());

        // 50 fps: the first report lands on frame 51 at 1.02 s.
        let step = Duration::from_millis(20);
        let reported = (1..=60u32).find_map(|i| stats.tick(t0 + step * i));
        assert_relative_eq!(reported.unwrap(), 50.0, epsilon = 1e-3);
    }

    #[test]
    fn window_restarts_after_report() {
        let mut stats = FrameStats::new(true, Duration::from_millis(100));
        let t0 = Instant::now();
        stats.tick(t0);
        assert!(stats.tick(t0 + Duration::from_millis(200)).is_some());
        assert!(stats.tick(t0 + Duration::from_millis(250)).is_none());
    }
}
