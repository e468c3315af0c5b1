//! Ultrasonic distance filter and stuck detector.
//!
//! Raw echo ranges are noisy: a single ghost echo off the floor can read
//! 3 cm in open space.  The filter keeps the last five samples and reports
//! their median.  The window boots full of max-range readings so nothing
//! looks like an obstacle before it has warmed up.
//!
//! Stuck detection runs on the filtered value:
//!
//! ```text
//!   close   = filtered < stuck_close_cm
//!   stable  = |filtered - previous| < stuck_band_cm
//!   stuck   = close && stable held continuously for stuck_timeout_ms
//! ```

use heapless::HistoryBuffer;

use crate::config::RobotConfig;

/// Smallest range the HC-SR04 resolves reliably.
pub const MIN_VALID_CM: u16 = 2;
/// Max range; also the sentinel reported on echo timeout.
pub const MAX_RANGE_CM: u16 = 400;
/// Median window length.
pub const WINDOW: usize = 5;

/// Thresholds the filter evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceLimits {
    pub stop_cm: u16,
    pub warn_cm: u16,
    pub stuck_close_cm: u16,
    pub stuck_band_cm: u16,
    pub stuck_timeout_ms: u32,
}

impl From<&RobotConfig> for DistanceLimits {
    fn from(c: &RobotConfig) -> Self {
        Self {
            stop_cm: c.stop_distance_cm,
            warn_cm: c.warn_distance_cm,
            stuck_close_cm: c.stuck_close_cm,
            stuck_band_cm: c.stuck_band_cm,
            stuck_timeout_ms: c.stuck_timeout_ms,
        }
    }
}

pub struct DistanceFilter {
    window: HistoryBuffer<u16, WINDOW>,
    filtered: u16,
    last_valid: u16,
    /// Uptime at which the close-and-stable condition started holding.
    stuck_since_ms: Option<u64>,
    limits: DistanceLimits,
}

impl DistanceFilter {
    pub fn new(limits: DistanceLimits) -> Self {
        Self {
            window: HistoryBuffer::new_with(MAX_RANGE_CM),
            filtered: MAX_RANGE_CM,
            last_valid: MAX_RANGE_CM,
            stuck_since_ms: None,
            limits,
        }
    }

    pub fn set_limits(&mut self, limits: DistanceLimits) {
        self.limits = limits;
    }

    pub fn limits(&self) -> &DistanceLimits {
        &self.limits
    }

    /// Push one raw sample and return the new filtered distance.
    ///
    /// Samples outside `[MIN_VALID_CM, MAX_RANGE_CM]` are replaced by the
    /// last valid one so a corrupt echo cannot trigger a false avoidance.
    pub fn update(&mut self, raw_cm: u16, now_ms: u64) -> u16 {
        let sample = if (MIN_VALID_CM..=MAX_RANGE_CM).contains(&raw_cm) {
            self.last_valid = raw_cm;
            raw_cm
        } else {
            self.last_valid
        };

        self.window.write(sample);
        let previous = self.filtered;
        self.filtered = median(self.window.as_slice());
        self.track_stuck(previous, now_ms);
        self.filtered
    }

    fn track_stuck(&mut self, previous: u16, now_ms: u64) {
        let close = self.filtered < self.limits.stuck_close_cm;
        let stable = self.filtered.abs_diff(previous) < self.limits.stuck_band_cm;
        if close && stable {
            self.stuck_since_ms.get_or_insert(now_ms);
        } else {
            self.stuck_since_ms = None;
        }
    }

    pub fn distance_cm(&self) -> u16 {
        self.filtered
    }

    pub fn obstacle_detected(&self) -> bool {
        self.filtered < self.limits.stop_cm
    }

    pub fn obstacle_far(&self) -> bool {
        self.filtered < self.limits.warn_cm
    }

    pub fn is_stuck(&self, now_ms: u64) -> bool {
        self.stuck_since_ms
            .is_some_and(|since| now_ms.saturating_sub(since) >= u64::from(self.limits.stuck_timeout_ms))
    }

    /// How long the stuck condition has held so far (0 if it is not holding).
    pub fn stuck_elapsed_ms(&self, now_ms: u64) -> u64 {
        self.stuck_since_ms.map_or(0, |since| now_ms.saturating_sub(since))
    }
}

/// Median of an odd-length window (upper median for even lengths).
pub fn median(samples: &[u16]) -> u16 {
    let mut sorted = [0u16; WINDOW];
    let n = samples.len().min(WINDOW);
    if n == 0 {
        return MAX_RANGE_CM;
    }
    sorted[..n].copy_from_slice(&samples[..n]);
    sorted[..n].sort_unstable();
    sorted[n / 2]
}
