//! LED pattern engine with priority-based pattern selection.
//!
//! Generates time-varying RGB values for the status LED.  The control loop
//! calls `tick()` each cycle and feeds the result to
//! [`ActuatorPort::set_status_color`](crate::app::ports::ActuatorPort::set_status_color).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Alert**, stuck escape or fault, red blink at 500 ms
//! 2. **Power**, low battery amber pulse
//! 3. **Behaviour**, exploring blue, obstacle yellow, seeking cyan, ...
//!
//! ## Pattern types
//!
//! | Pattern    | Description                  | Period  |
//! |------------|------------------------------|---------|
//! | Solid      | Constant colour              | -       |
//! | Blink      | On/off square wave           | 1000 ms |
//! | SlowPulse  | Triangular brightness fade   | 1000 ms |
//! | Breathing  | Dim, slow fade               | 4000 ms |

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    /// 500 ms on, 500 ms off.
    Blink,
    SlowPulse,
    /// Quarter-brightness fade, used while dead.
    Breathing,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRequest {
    pub colour: Rgb,
    pub pattern: PatternId,
    pub priority: u8,
}

/// LED pattern engine. Stack-allocated, no heap.
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<PatternRequest>,
    behavior_request: Option<PatternRequest>,
    power_request: Option<PatternRequest>,
    alert_request: Option<PatternRequest>,
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            phase_ms: 0,
            active: None,
            behavior_request: None,
            power_request: None,
            alert_request: None,
        }
    }

    /// Set the behaviour-layer pattern (priority 3, lowest).
    pub fn set_behavior_pattern(&mut self, colour: Rgb, pattern: PatternId) {
        self.behavior_request = Some(PatternRequest {
            colour,
            pattern,
            priority: 3,
        });
    }

    /// Set or clear the low-battery overlay (priority 2).
    pub fn set_low_battery(&mut self, active: bool) {
        self.power_request = active.then_some(PatternRequest {
            colour: COLOUR_LOW_BATTERY,
            pattern: PatternId::SlowPulse,
            priority: 2,
        });
    }

    /// Set or clear the alert pattern (priority 1, highest).
    pub fn set_alert(&mut self, active: bool) {
        self.alert_request = active.then_some(PatternRequest {
            colour: COLOUR_ALERT,
            pattern: PatternId::Blink,
            priority: 1,
        });
    }

    /// Clear all patterns, LED will be off.
    pub fn clear_all(&mut self) {
        self.behavior_request = None;
        self.power_request = None;
        self.alert_request = None;
        self.active = None;
        self.phase_ms = 0;
    }

    /// Advance the pattern phase and return the current RGB output.
    /// `delta_ms` is the time since the last call.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        let selected = self.select_active();
        let reset_phase = match (&self.active, &selected) {
            (Some(prev), Some(next)) => {
                prev.priority != next.priority || prev.pattern != next.pattern
            }
            (None, Some(_)) => true,
            _ => false,
        };
        if reset_phase {
            self.phase_ms = 0;
        }
        self.active = selected;

        match &self.active {
            Some(req) => self.generate(req.colour, req.pattern),
            None => (0, 0, 0),
        }
    }

    pub fn active(&self) -> Option<PatternRequest> {
        self.active
    }

    fn select_active(&self) -> Option<PatternRequest> {
        self.alert_request
            .or(self.power_request)
            .or(self.behavior_request)
    }

    fn generate(&self, colour: Rgb, pattern: PatternId) -> Rgb {
        let (r, g, b) = colour;
        match pattern {
            PatternId::Solid => colour,
            PatternId::Off => (0, 0, 0),
            PatternId::Blink => {
                if (self.phase_ms % 1000) < 500 { colour } else { (0, 0, 0) }
            }
            PatternId::SlowPulse => {
                let brightness = Self::triangle(self.phase_ms, 1000);
                Self::scale(r, g, b, brightness)
            }
            PatternId::Breathing => {
                let brightness = Self::triangle(self.phase_ms, 4000) / 4;
                Self::scale(r, g, b, brightness)
            }
        }
    }

    /// Triangular brightness curve: 0→255→0 over `period_ms`.
    fn triangle(phase_ms: u32, period_ms: u32) -> u8 {
        let pos = u64::from(phase_ms % period_ms);
        let half = u64::from(period_ms) / 2;
        if pos < half {
            ((pos * 255) / half) as u8
        } else {
            ((u64::from(period_ms) - pos) * 255 / half) as u8
        }
    }

    fn scale(r: u8, g: u8, b: u8, brightness: u8) -> Rgb {
        let br = u16::from(brightness);
        (
            ((u16::from(r) * br) / 255) as u8,
            ((u16::from(g) * br) / 255) as u8,
            ((u16::from(b) * br) / 255) as u8,
        )
    }
}

pub const COLOUR_BOOTING: Rgb = (255, 0, 0);
pub const COLOUR_READY: Rgb = (0, 255, 0);
pub const COLOUR_EXPLORING: Rgb = (0, 0, 255);
pub const COLOUR_OBSTACLE: Rgb = (255, 255, 0);
pub const COLOUR_SEEKING: Rgb = (0, 255, 255);
pub const COLOUR_ALERT: Rgb = (255, 0, 0);
pub const COLOUR_DEAD: Rgb = (255, 60, 0);
pub const COLOUR_LOW_BATTERY: Rgb = (255, 120, 0);
/// Solid colour shown when peripheral init fails and the firmware halts.
pub const COLOUR_FATAL: Rgb = (255, 0, 255);
