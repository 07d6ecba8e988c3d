//! Activation latency tracking with HdrHistogram.
//!
//! [`ActivationLatency`] records per-activation cost in nanoseconds;
//! [`CycleTimer`] reads the TSC-backed clock cheaply enough to wrap every
//! single activation.

use std::fmt;

use hdrhistogram::{AdditionError, CreationError, Histogram};

/// Latency histogram for pool activations.
pub struct ActivationLatency {
    histogram: Histogram<u64>,
}

impl ActivationLatency {
    /// Auto-resizing histogram with 3 significant digits.
    pub fn new() -> Result<Self, CreationError> {
        Self::with_precision(3)
    }

    /// Custom precision (1-5 significant digits).
    pub fn with_precision(sigfig: u8) -> Result<Self, CreationError> {
        Ok(Self {
            histogram: Histogram::new(sigfig)?,
        })
    }

    /// Record one activation, in nanoseconds.
    #[inline(always)]
    pub fn record(&mut self, nanos: u64) {
        self.histogram.saturating_record(nanos);
    }

    /// Value at `percentile` (0.0 - 100.0).
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        self.histogram.value_at_quantile(percentile / 100.0)
    }

    pub fn p50(&self) -> u64 {
        self.value_at_percentile(50.0)
    }

    pub fn p90(&self) -> u64 {
        self.value_at_percentile(90.0)
    }

    pub fn p99(&self) -> u64 {
        self.value_at_percentile(99.0)
    }

    pub fn p999(&self) -> u64 {
        self.value_at_percentile(99.9)
    }

    pub fn max(&self) -> u64 {
        self.histogram.max()
    }

    pub fn min(&self) -> u64 {
        self.histogram.min()
    }

    pub fn mean(&self) -> f64 {
        self.histogram.mean()
    }

    /// Number of recorded activations.
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// Fold another histogram into this one.
    ///
    /// # Errors
    /// Fails if `other` holds values this histogram cannot represent.
    pub fn merge(&mut self, other: &ActivationLatency) -> Result<(), AdditionError> {
        self.histogram.add(&other.histogram)
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    /// Snapshot of the headline percentiles under `label`.
    pub fn report(&self, label: impl Into<String>) -> LatencyReport {
        LatencyReport {
            label: label.into(),
            count: self.count(),
            p50: self.p50(),
            p90: self.p90(),
            p99: self.p99(),
            p999: self.p999(),
            max: self.max(),
            mean: self.mean(),
        }
    }
}

/// Percentile summary printable with `{}`.
#[derive(Clone, Debug, PartialEq)]
pub struct LatencyReport {
    pub label: String,
    pub count: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
    pub mean: f64,
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({} samples):", self.label, self.count)?;
        writeln!(f, "  P50:   {:>10}", format_latency(self.p50))?;
        writeln!(f, "  P90:   {:>10}", format_latency(self.p90))?;
        writeln!(f, "  P99:   {:>10}", format_latency(self.p99))?;
        writeln!(f, "  P99.9: {:>10}", format_latency(self.p999))?;
        writeln!(f, "  Max:   {:>10}", format_latency(self.max))?;
        write!(f, "  Mean:  {:>10}", format_latency(self.mean as u64))
    }
}

/// Format nanoseconds with a readable unit.
pub fn format_latency(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{} ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2} μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2} ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", nanos as f64 / 1_000_000_000.0)
    }
}

/// Low-overhead timer over the raw TSC clock.
#[derive(Clone)]
pub struct CycleTimer {
    clock: quanta::Clock,
}

impl CycleTimer {
    pub fn new() -> Self {
        Self {
            clock: quanta::Clock::new(),
        }
    }

    /// Raw timestamp.
    #[inline(always)]
    pub fn start(&self) -> u64 {
        self.clock.raw()
    }

    /// Nanoseconds between two raw timestamps.
    #[inline(always)]
    pub fn delta_as_nanos(&self, start: u64, end: u64) -> u64 {
        self.clock.delta_as_nanos(start, end)
    }

    /// Nanoseconds since `start`.
    #[inline(always)]
    pub fn elapsed_nanos(&self, start: u64) -> u64 {
        self.delta_as_nanos(start, self.clock.raw())
    }

    /// Run `f`, recording its duration into `latency`.
    #[inline]
    pub fn time<T>(&self, latency: &mut ActivationLatency, f: impl FnOnce() -> T) -> T {
        let start = self.start();
        let out = f();
        latency.record(self.elapsed_nanos(start));
        out
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_basic() {
        let mut h = ActivationLatency::new().unwrap();

        for i in 1..=100 {
            h.record(i * 100);
        }

        assert_eq!(h.count(), 100);
        assert!(h.p50() >= 4900 && h.p50() <= 5100);
        assert_eq!(h.min(), 100);
        // HdrHistogram may round max value slightly
        assert!(h.max() >= 10000 && h.max() <= 10100);
    }

    #[test]
    fn test_invalid_precision_is_an_error() {
        assert!(ActivationLatency::with_precision(9).is_err());
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut a = ActivationLatency::new().unwrap();
        let mut b = ActivationLatency::new().unwrap();
        a.record(10);
        b.record(20);
        b.record(30);

        a.merge(&b).unwrap();
        assert_eq!(a.count(), 3);
        assert!(a.max() >= 30);
    }

    #[test]
    fn test_merge_into_bounded_histogram_reports_overflow() {
        let mut bounded = ActivationLatency {
            histogram: Histogram::new_with_bounds(1, 1_000, 3).unwrap(),
        };
        let mut wide = ActivationLatency::new().unwrap();
        wide.record(1_000_000);

        assert!(bounded.merge(&wide).is_err());
        assert_eq!(bounded.count(), 0);
    }

    #[test]
    fn test_report_display() {
        let mut h = ActivationLatency::new().unwrap();
        h.record(250);
        let report = h.report("Projectiles");

        assert_eq!(report.count, 1);
        let text = report.to_string();
        assert!(text.starts_with("Projectiles (1 samples):"));
        assert!(text.contains("P99.9:"));
        assert!(text.contains("250 ns"));
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(500), "500 ns");
        assert_eq!(format_latency(5000), "5.00 μs");
        assert_eq!(format_latency(5_000_000), "5.00 ms");
        assert_eq!(format_latency(5_000_000_000), "5.00 s");
    }

    #[test]
    fn test_timer_records_into_histogram() {
        let timer = CycleTimer::new();
        let mut h = ActivationLatency::new().unwrap();

        let value = timer.time(&mut h, || 41 + 1);
        assert_eq!(value, 42);
        assert_eq!(h.count(), 1);
    }
}
