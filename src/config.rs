//! Robot configuration parameters
//!
//! All tunable parameters for the EMBER control loop.  Values can be
//! overridden via NVS (non-volatile storage) or the serial console; every
//! path into the running system goes through [`RobotConfig::sanitized`],
//! which clamps out-of-range values to the nearest bound.

use serde::{Deserialize, Serialize};

use crate::life::LifeParams;

/// Core robot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    // --- Distance thresholds ---
    /// Filtered distance (cm) below which an obstacle triggers avoidance
    pub stop_distance_cm: u16,
    /// Filtered distance (cm) below which exploration slows to a crawl
    pub warn_distance_cm: u16,
    /// Extra clearance (cm) beyond the stop distance required to finish avoidance
    pub clear_margin_cm: u16,

    // --- Stuck detection ---
    /// Distance (cm) under which the robot is a stuck candidate
    pub stuck_close_cm: u16,
    /// Maximum change (cm) between readings that still counts as unchanged
    pub stuck_band_cm: u16,
    /// How long (ms) the close-and-unchanged condition must hold
    pub stuck_timeout_ms: u32,

    // --- Avoidance timing ---
    /// Minimum gap (ms) after a finished maneuver before a new obstacle trigger
    pub avoid_cooldown_ms: u32,
    /// Time-boxed reverse duration (ms)
    pub backup_duration_ms: u32,
    /// Committed turn duration (ms)
    pub turn_duration_ms: u32,
    /// Pause (ms) before re-measuring after a turn
    pub verify_settle_ms: u32,
    /// Failed verifications tolerated before escalating to stuck escape
    pub max_turn_retries: u8,
    /// Look left and right before committing to a turn direction
    pub scan_before_turn: bool,
    /// Time (ms) spent spinning to look to one side
    pub scan_look_ms: u32,
    /// Stuck-escape reverse duration (ms)
    pub escape_backup_ms: u32,
    /// Stuck-escape spin duration (ms), roughly a half turn at max speed
    pub escape_spin_ms: u32,
    /// Stuck-escape pause between moves (ms)
    pub escape_pause_ms: u32,

    // --- Motion ---
    /// Full reverse speed used while backing away
    pub backup_speed: u8,
    /// Spin speed used while scanning and turning
    pub turn_speed: u8,
    /// Slow exploration speed
    pub crawl_speed: u8,
    /// Top speed (stuck escape, `run`)
    pub max_speed: u8,
    /// Speed change per ramp step
    pub ramp_step: u8,
    /// Interval between ramp steps (ms)
    pub ramp_interval_ms: u32,
    /// Signed PWM trim added to the left wheel
    pub left_trim: i16,
    /// Signed PWM trim added to the right wheel
    pub right_trim: i16,
    /// Swap forward/reverse on the left wheel
    pub left_inverted: bool,
    /// Swap forward/reverse on the right wheel
    pub right_inverted: bool,

    // --- Life model ---
    /// Energy lost per second
    pub energy_decay_per_s: f32,
    /// Decay multiplier while the wheels are turning
    pub movement_cost_multiplier: f32,
    /// Energy gained per second per unit of excess light
    pub energy_gain_rate: f32,
    /// Energy below which the robot goes looking for light
    pub seek_energy_threshold: f32,

    // --- Light calibration (raw 12-bit ADC) ---
    pub light_left_dark_adc: u16,
    pub light_left_bright_adc: u16,
    pub light_right_dark_adc: u16,
    pub light_right_bright_adc: u16,

    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Battery sampling interval (milliseconds)
    pub battery_interval_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            // Distance
            stop_distance_cm: 20,
            warn_distance_cm: 40,
            clear_margin_cm: 5,

            // Stuck
            stuck_close_cm: 15,
            stuck_band_cm: 2,
            stuck_timeout_ms: 3000,

            // Avoidance
            avoid_cooldown_ms: 500,
            backup_duration_ms: 600,
            turn_duration_ms: 400,
            verify_settle_ms: 200,
            max_turn_retries: 3,
            scan_before_turn: true,
            scan_look_ms: 300,
            escape_backup_ms: 1000,
            escape_spin_ms: 1600,
            escape_pause_ms: 200,

            // Motion
            backup_speed: 180,
            turn_speed: 200,
            crawl_speed: 100,
            max_speed: 255,
            ramp_step: 5,
            ramp_interval_ms: 20,
            left_trim: 0,
            right_trim: 0,
            left_inverted: false,
            right_inverted: false,

            // Life
            energy_decay_per_s: 0.1,
            movement_cost_multiplier: 1.5,
            energy_gain_rate: 2.0,
            seek_energy_threshold: 99.0,

            // Light calibration
            light_left_dark_adc: 200,
            light_left_bright_adc: 3800,
            light_right_dark_adc: 200,
            light_right_bright_adc: 3800,

            // Timing
            control_loop_interval_ms: 20,   // 50 Hz
            battery_interval_ms: 5000,      // 0.2 Hz
            telemetry_interval_secs: 10,
        }
    }
}

/// Accepted range for the session-only energy decay tunable.
pub const ENERGY_DECAY_RANGE: (f32, f32) = (0.0, 5.0);
/// Accepted range for the stop / warn distances.
pub const DISTANCE_THRESHOLD_RANGE: (u16, u16) = (5, 200);

impl RobotConfig {
    /// Return a copy with every field clamped into its accepted range.
    ///
    /// Out-of-range values are never rejected: a bad value from the console
    /// or a stale NVS blob ends up at the nearest bound.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let (dmin, dmax) = DISTANCE_THRESHOLD_RANGE;
        let mut c = self.clone();

        c.stop_distance_cm = c.stop_distance_cm.clamp(dmin, dmax);
        c.warn_distance_cm = c.warn_distance_cm.clamp(c.stop_distance_cm, dmax);
        c.clear_margin_cm = c.clear_margin_cm.min(50);

        c.stuck_close_cm = c.stuck_close_cm.clamp(2, dmax);
        c.stuck_band_cm = c.stuck_band_cm.clamp(1, 20);
        c.stuck_timeout_ms = c.stuck_timeout_ms.clamp(500, 60_000);

        c.avoid_cooldown_ms = c.avoid_cooldown_ms.min(10_000);
        c.backup_duration_ms = c.backup_duration_ms.clamp(100, 5000);
        c.turn_duration_ms = c.turn_duration_ms.clamp(100, 5000);
        c.verify_settle_ms = c.verify_settle_ms.min(2000);
        c.max_turn_retries = c.max_turn_retries.clamp(1, 20);
        c.scan_look_ms = c.scan_look_ms.clamp(50, 2000);
        c.escape_backup_ms = c.escape_backup_ms.clamp(100, 5000);
        c.escape_spin_ms = c.escape_spin_ms.clamp(100, 10_000);
        c.escape_pause_ms = c.escape_pause_ms.min(2000);

        c.ramp_step = c.ramp_step.max(1);
        c.ramp_interval_ms = c.ramp_interval_ms.clamp(1, 1000);
        c.left_trim = c.left_trim.clamp(-100, 100);
        c.right_trim = c.right_trim.clamp(-100, 100);

        c.energy_decay_per_s = clamp_f32(c.energy_decay_per_s, ENERGY_DECAY_RANGE.0, ENERGY_DECAY_RANGE.1);
        c.movement_cost_multiplier = clamp_f32(c.movement_cost_multiplier, 1.0, 10.0);
        c.energy_gain_rate = clamp_f32(c.energy_gain_rate, 0.0, 50.0);
        c.seek_energy_threshold = clamp_f32(c.seek_energy_threshold, 0.0, 100.0);

        if c.light_left_bright_adc <= c.light_left_dark_adc {
            c.light_left_bright_adc = c.light_left_dark_adc.saturating_add(1);
        }
        if c.light_right_bright_adc <= c.light_right_dark_adc {
            c.light_right_bright_adc = c.light_right_dark_adc.saturating_add(1);
        }

        c.control_loop_interval_ms = c.control_loop_interval_ms.clamp(5, 1000);
        c.battery_interval_ms = c.battery_interval_ms.clamp(500, 600_000);
        c.telemetry_interval_secs = c.telemetry_interval_secs.clamp(1, 3600);
        c
    }

    /// Energy parameters for the life model.
    pub fn life_params(&self) -> LifeParams {
        LifeParams {
            decay_rate: self.energy_decay_per_s,
            movement_multiplier: self.movement_cost_multiplier,
            gain_rate: self.energy_gain_rate,
        }
    }
}

/// `f32::clamp` that also maps NaN to the lower bound.
pub(crate) fn clamp_f32(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}
