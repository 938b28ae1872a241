use std::time::{Duration, Instant};

/// Stopwatch that accumulates the duration of a repeated measured section.
///
/// Two averages are tracked:
/// - a rolling window of `report_every` samples, logged at info level and reset
///   each time it fills
/// - an overall average across every sample since construction
#[derive(Debug, Clone)]
pub struct CostTimer {
    label: &'static str,
    started: Option<Instant>,

    total: Duration,
    count: u64,

    window_total: Duration,
    window_count: u64,
    report_every: u64,
}

impl CostTimer {
    /// Default rolling window length.
    pub const DEFAULT_REPORT_EVERY: u64 = 1000;

    pub fn new(label: &'static str) -> Self {
        Self::with_report_interval(label, Self::DEFAULT_REPORT_EVERY)
    }

    /// Creates a timer whose rolling average is reported every `report_every` samples.
    ///
    /// `0` disables periodic reporting.
    pub fn with_report_interval(label: &'static str, report_every: u64) -> Self {
        Self {
            label,
            started: None,
            total: Duration::ZERO,
            count: 0,
            window_total: Duration::ZERO,
            window_count: 0,
            report_every,
        }
    }

    /// Marks the beginning of a measured section.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Ends the measured section started by [`CostTimer::start`] and records it.
    ///
    /// Returns `Duration::ZERO` without recording if `start` was not called.
    pub fn stop(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.record(elapsed);
        elapsed
    }

    /// Records an externally measured sample.
    pub fn record(&mut self, sample: Duration) {
        self.total += sample;
        self.count += 1;
        self.window_total += sample;
        self.window_count += 1;

        if self.report_every > 0 && self.window_count >= self.report_every {
            log::info!(
                "[{}] {} samples, avg cost {:.4} ms",
                self.label,
                self.window_count,
                as_millis(average(self.window_total, self.window_count)),
            );
            self.window_total = Duration::ZERO;
            self.window_count = 0;
        }
    }

    /// Average over every recorded sample; zero if nothing was recorded.
    pub fn average(&self) -> Duration {
        average(self.total, self.count)
    }

    /// Average over the current, not yet reported, rolling window.
    pub fn window_average(&self) -> Duration {
        average(self.window_total, self.window_count)
    }

    /// Number of recorded samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all recorded samples.
    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(total.as_secs_f64() / count as f64)
}

/// Fractional milliseconds, the unit benchmark reports are printed in.
pub fn as_millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_timer_averages_zero() {
        let t = CostTimer::new("empty");
        assert_eq!(t.average(), Duration::ZERO);
        assert_eq!(t.count(), 0);
    }

    #[test]
    fn stop_without_start_records_nothing() {
        let mut t = CostTimer::new("unstarted");
        assert_eq!(t.stop(), Duration::ZERO);
        assert_eq!(t.count(), 0);
    }

    #[test]
    fn start_stop_records_one_sample() {
        let mut t = CostTimer::new("single");
        t.start();
        let elapsed = t.stop();
        assert_eq!(t.count(), 1);
        assert_eq!(t.total(), elapsed);
    }

    #[test]
    fn average_is_mean_of_samples() {
        let mut t = CostTimer::with_report_interval("mean", 0);
        t.record(Duration::from_millis(1));
        t.record(Duration::from_millis(3));
        assert_relative_eq!(as_millis(t.average()), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn rolling_window_resets_but_overall_average_survives() {
        let mut t = CostTimer::with_report_interval("window", 2);
        t.record(Duration::from_millis(2));
        t.record(Duration::from_millis(2));
        assert_eq!(t.window_average(), Duration::ZERO);

        t.record(Duration::from_millis(8));
        assert_relative_eq!(as_millis(t.window_average()), 8.0, epsilon = 1e-9);
        assert_relative_eq!(as_millis(t.average()), 4.0, epsilon = 1e-9);
        assert_eq!(t.count(), 3);
    }
}
