//! Server clock estimation from round-trip probes.
//!
//! The client stamps each probe with its own clock `c`; the server echoes it
//! with its clock `s`. Assuming a symmetric path, the server read `s` at
//! local time `c + rtt / 2`, which gives one raw offset sample. The first
//! sample is taken as-is and later ones are folded in with an exponential
//! moving average. A probe that never comes back changes nothing.

use log::debug;
use shared::{now_ms, CLOCK_SMOOTHING};

#[derive(Debug, Clone)]
pub struct ClockSync {
    /// Estimated `server_clock - client_clock`, in ms.
    offset: f64,
    alpha: f64,
    samples: u32,
    last_rtt: Option<u64>,
}

impl ClockSync {
    pub fn new() -> Self {
        Self::with_smoothing(CLOCK_SMOOTHING)
    }

    pub fn with_smoothing(alpha: f64) -> Self {
        Self {
            offset: 0.0,
            alpha: alpha.clamp(0.0, 1.0),
            samples: 0,
            last_rtt: None,
        }
    }

    /// Folds in the echo of a probe sent at local time `c`, stamped `s` by
    /// the server and received at local time `received_at`.
    ///
    /// Returns the raw offset sample.
    pub fn record_echo(&mut self, c: u64, s: u64, received_at: u64) -> f64 {
        let rtt = received_at.saturating_sub(c);
        let one_way = rtt as f64 / 2.0;
        let sample = s as f64 - (c as f64 + one_way);

        if self.samples == 0 {
            self.offset = sample;
        } else {
            self.offset = (1.0 - self.alpha) * self.offset + self.alpha * sample;
        }
        self.samples += 1;
        self.last_rtt = Some(rtt);

        debug!(
            "Clock probe: rtt {}ms, sample {:.1}ms, offset {:.1}ms",
            rtt, sample, self.offset
        );
        sample
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Server time corresponding to local time `local_ms`.
    pub fn corrected(&self, local_ms: u64) -> f64 {
        local_ms as f64 + self.offset
    }

    /// Current estimate of the server clock.
    pub fn now(&self) -> f64 {
        self.corrected(now_ms())
    }

    pub fn rtt(&self) -> Option<u64> {
        self.last_rtt
    }

    pub fn sample_count(&self) -> u32 {
        self.samples
    }

    pub fn is_synchronized(&self) -> bool {
        self.samples > 0
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_starts_at_zero() {
        let clock = ClockSync::new();
        assert_eq!(clock.offset(), 0.0);
        assert!(!clock.is_synchronized());
        assert!(clock.rtt().is_none());
        assert_eq!(clock.corrected(1000), 1000.0);
    }

    #[test]
    fn test_first_sample_sets_offset_exactly() {
        let mut clock = ClockSync::new();
        let sample = clock.record_echo(1000, 5050, 1100);
        assert_eq!(sample, 4000.0);
        assert_eq!(clock.offset(), 4000.0);
        assert_eq!(clock.rtt(), Some(100));
        assert_eq!(clock.corrected(2000), 6000.0);
    }

    #[test]
    fn test_ema_sequence() {
        let mut clock = ClockSync::new();

        clock.record_echo(1000, 5050, 1100); // sample 4000
        assert_eq!(clock.offset(), 4000.0);

        clock.record_echo(2000, 6080, 2060); // sample 4050
        assert_approx_eq!(clock.offset(), 4010.0, 1e-9);

        clock.record_echo(3000, 6990, 3020); // sample 3980
        assert_approx_eq!(clock.offset(), 4004.0, 1e-9);

        clock.record_echo(4000, 8100, 4200); // sample 4000
        assert_approx_eq!(clock.offset(), 4003.2, 1e-9);

        assert_eq!(clock.sample_count(), 4);
        assert_eq!(clock.rtt(), Some(200));
    }

    #[test]
    fn test_zero_first_sample_still_counts() {
        let mut clock = ClockSync::new();
        clock.record_echo(1000, 1010, 1020); // sample 0
        assert_eq!(clock.offset(), 0.0);

        clock.record_echo(2000, 2110, 2020); // sample 100
        assert_approx_eq!(clock.offset(), 20.0, 1e-9);
    }

    #[test]
    fn test_negative_rtt_clamped() {
        let mut clock = ClockSync::new();
        // Receive stamp earlier than the send stamp: treat the trip as instant.
        let sample = clock.record_echo(5000, 7000, 4990);
        assert_eq!(clock.rtt(), Some(0));
        assert_eq!(sample, 2000.0);
    }

    #[test]
    fn test_server_behind_client() {
        let mut clock = ClockSync::new();
        clock.record_echo(10_000, 9_000, 10_040);
        assert_eq!(clock.offset(), -1020.0);
        assert_eq!(clock.corrected(20_000), 18_980.0);
    }

    #[test]
    fn test_now_tracks_local_clock() {
        let mut clock = ClockSync::new();
        clock.record_echo(0, 250, 0);
        let local = now_ms() as f64;
        let corrected = clock.now();
        assert!(corrected >= local + 250.0);
        assert!(corrected < local + 250.0 + 1000.0);
    }
}
