//! Sensor filter layer: the aggregating [`SensorHub`] and its filters.
//!
//! The hub owns the distance and light filters and produces a
//! [`SensorSnapshot`] once per control cycle.  Raw samples arrive through
//! the [`SensorPort`](crate::app::ports::SensorPort); everything here is
//! pure logic.

pub mod distance;
pub mod light;

use distance::{DistanceFilter, DistanceLimits};
use light::{LightFilter, LightReading};

/// A point-in-time view of every filtered signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    /// Median-filtered range (cm).
    pub distance_cm: u16,
    /// Filtered distance below the stop threshold.
    pub obstacle: bool,
    /// Filtered distance below the warn threshold.
    pub obstacle_far: bool,
    /// Close-and-unchanged for the full stuck timeout.
    pub stuck: bool,
    /// Averaged brightness pair.
    pub light: LightReading,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            distance_cm: distance::MAX_RANGE_CM,
            obstacle: false,
            obstacle_far: false,
            stuck: false,
            light: LightReading::default(),
        }
    }
}

/// Aggregates every filter and produces a unified snapshot.
pub struct SensorHub {
    pub distance: DistanceFilter,
    pub light: LightFilter,
    snapshot: SensorSnapshot,
}

impl SensorHub {
    pub fn new(limits: DistanceLimits) -> Self {
        Self {
            distance: DistanceFilter::new(limits),
            light: LightFilter::new(),
            snapshot: SensorSnapshot::default(),
        }
    }

    /// Feed one round of raw samples and return the filtered snapshot.
    ///
    /// Must run exactly once per control cycle so the windows stay warm.
    pub fn sample(&mut self, raw_distance_cm: u16, light_left: f32, light_right: f32, now_ms: u64) -> SensorSnapshot {
        let distance_cm = self.distance.update(raw_distance_cm, now_ms);
        let light = self.light.update(light_left, light_right);

        self.snapshot = SensorSnapshot {
            distance_cm,
            obstacle: self.distance.obstacle_detected(),
            obstacle_far: self.distance.obstacle_far(),
            stuck: self.distance.is_stuck(now_ms),
            light,
        };
        self.snapshot
    }

    /// The snapshot from the most recent [`sample`](Self::sample).
    pub fn snapshot(&self) -> SensorSnapshot {
        self.snapshot
    }
}
