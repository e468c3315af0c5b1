//! Battery monitor and power-mode policy.
//!
//! The pack is a 2S Li-ion (6.4 V empty, 8.4 V full).  The monitor samples
//! on its own cadence, independent of the control loop, and maps voltage to
//! a coarse [`PowerMode`] that the arbiter and motion code consult.
//!
//! ```text
//!   V ≥ 7.8  NORMAL
//!   V ≥ 7.2  ECONOMY   (seeking and backup speeds scaled down)
//!   V ≥ 6.8  LOW
//!   V ≥ 6.4  CRITICAL  (forced idle)
//!   else     SHUTDOWN  (forced idle)
//!   V > 9.0  USB_DEBUG (no pack attached, pct = 101)
//! ```

use log::{info, warn};

pub const NORMAL_MIN_V: f32 = 7.8;
pub const ECONOMY_MIN_V: f32 = 7.2;
pub const LOW_MIN_V: f32 = 6.8;
pub const CRITICAL_MIN_V: f32 = 6.4;
pub const USB_DEBUG_ABOVE_V: f32 = 9.0;
pub const FULL_V: f32 = 8.4;
pub const EMPTY_V: f32 = CRITICAL_MIN_V;

/// Percentage reported when the unit runs from a programming cable.
pub const USB_DEBUG_PERCENT: f32 = 101.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PowerMode {
    Normal = 0,
    Economy = 1,
    Low = 2,
    Critical = 3,
    Shutdown = 4,
    UsbDebug = 5,
}

impl PowerMode {
    /// Step function of pack voltage, with the USB-cable override on top.
    pub fn for_voltage(volts: f32) -> Self {
        if volts > USB_DEBUG_ABOVE_V {
            Self::UsbDebug
        } else if volts >= NORMAL_MIN_V {
            Self::Normal
        } else if volts >= ECONOMY_MIN_V {
            Self::Economy
        } else if volts >= LOW_MIN_V {
            Self::Low
        } else if volts >= CRITICAL_MIN_V {
            Self::Critical
        } else {
            Self::Shutdown
        }
    }

    /// Modes in which the robot must stop moving to save the pack.
    pub fn must_conserve(self) -> bool {
        matches!(self, Self::Critical | Self::Shutdown)
    }

    /// Modes in which maneuvers run at reduced speed.
    pub fn is_economy(self) -> bool {
        matches!(self, Self::Economy)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Economy => "ECONOMY",
            Self::Low => "LOW",
            Self::Critical => "CRITICAL",
            Self::Shutdown => "SHUTDOWN",
            Self::UsbDebug => "USB_DEBUG",
        }
    }
}

/// Linear charge estimate between [`EMPTY_V`] and [`FULL_V`].
pub fn percentage_for_voltage(volts: f32) -> f32 {
    if volts > USB_DEBUG_ABOVE_V {
        return USB_DEBUG_PERCENT;
    }
    let pct = (volts - EMPTY_V) / (FULL_V - EMPTY_V) * 100.0;
    if pct.is_nan() { 0.0 } else { pct.clamp(0.0, 100.0) }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    pub voltage: f32,
    pub percentage: f32,
    pub mode: PowerMode,
    /// Uptime (ms) of the last sample; `None` before the first one.
    pub last_update_ms: Option<u64>,
}

impl Default for BatteryState {
    fn default() -> Self {
        Self {
            voltage: 0.0,
            percentage: 0.0,
            mode: PowerMode::Normal,
            last_update_ms: None,
        }
    }
}

/// Periodic battery sampler.
pub struct BatteryMonitor {
    state: BatteryState,
    interval_ms: u32,
}

impl BatteryMonitor {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            state: BatteryState::default(),
            interval_ms,
        }
    }

    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms;
    }

    /// `true` when a fresh sample should be taken at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.state.last_update_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.interval_ms),
        }
    }

    /// Record a voltage sample.  Returns `Some((from, to))` when the power
    /// mode changed.
    pub fn update(&mut self, now_ms: u64, volts: f32) -> Option<(PowerMode, PowerMode)> {
        let prev = self.state.mode;
        let first = self.state.last_update_ms.is_none();
        let mode = PowerMode::for_voltage(volts);

        self.state = BatteryState {
            voltage: volts,
            percentage: percentage_for_voltage(volts),
            mode,
            last_update_ms: Some(now_ms),
        };

        if first || mode != prev {
            match mode {
                PowerMode::Critical | PowerMode::Shutdown => {
                    warn!("Battery {:.2} V → {} (forced idle)", volts, mode.as_str());
                }
                _ => info!(
                    "Battery {:.2} V ({:.0}%) → {}",
                    volts,
                    self.state.percentage,
                    mode.as_str()
                ),
            }
        }

        (mode != prev).then_some((prev, mode))
    }

    pub fn state(&self) -> &BatteryState {
        &self.state
    }

    pub fn mode(&self) -> PowerMode {
        self.state.mode
    }
}
