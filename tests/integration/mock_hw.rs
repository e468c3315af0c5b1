//! Mock adapters for integration tests.
//!
//! [`MockHardware`] serves scripted sensor values and records every
//! actuator call so tests can assert on the full command history without
//! touching real GPIO/PWM registers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use ember::app::events::AppEvent;
use ember::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, EventSink, GenomePort, RandomSource, SensorPort, Side,
};
use ember::config::RobotConfig;
use ember::genome::Genome;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Wheel { side: Side, magnitude: u8, forward: bool },
    StopAll,
    Led { r: u8, g: u8, b: u8 },
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub distance_cm: u16,
    pub light_left: f32,
    pub light_right: f32,
    pub battery_v: f32,
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    /// Open floor, dark room, healthy pack.
    pub fn new() -> Self {
        Self {
            distance_cm: 400,
            light_left: 0.0,
            light_right: 0.0,
            battery_v: 8.0,
            calls: Vec::new(),
        }
    }

    pub fn set_light(&mut self, left: f32, right: f32) {
        self.light_left = left;
        self.light_right = right;
    }

    pub fn led_history(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.calls.iter().filter_map(|c| match *c {
            ActuatorCall::Led { r, g, b } => Some((r, g, b)),
            _ => None,
        })
    }

    pub fn last_led(&self) -> Option<(u8, u8, u8)> {
        self.led_history().last()
    }

    /// Signed speed last written to one wheel.
    pub fn wheel_speed(&self, side: Side) -> i16 {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::Wheel { side: s, magnitude, forward } if s == side => {
                    let m = i16::from(magnitude);
                    Some(if forward { m } else { -m })
                }
                ActuatorCall::StopAll => Some(0),
                _ => None,
            })
            .unwrap_or(0)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_distance_cm(&mut self) -> u16 {
        self.distance_cm
    }

    fn read_light(&mut self, side: Side) -> f32 {
        match side {
            Side::Left => self.light_left,
            Side::Right => self.light_right,
        }
    }

    fn read_battery_voltage(&mut self) -> f32 {
        self.battery_v
    }
}

impl ActuatorPort for MockHardware {
    fn set_wheel_speed(&mut self, side: Side, magnitude: u8, forward: bool) {
        self.calls.push(ActuatorCall::Wheel { side, magnitude, forward });
    }

    fn stop_all_wheels(&mut self) {
        self.calls.push(ActuatorCall::StopAll);
    }

    fn set_status_color(&mut self, r: u8, g: u8, b: u8) {
        self.calls.push(ActuatorCall::Led { r, g, b });
    }
}

// ── Event sink ────────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.iter().any(|e| e == event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Storage ───────────────────────────────────────────────────

pub struct MemStore {
    pub genome: RefCell<Option<Genome>>,
    pub config: RefCell<Option<RobotConfig>>,
    pub config_saves: Cell<u32>,
    pub genome_saves: Cell<u32>,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self {
            genome: RefCell::new(None),
            config: RefCell::new(None),
            config_saves: Cell::new(0),
            genome_saves: Cell::new(0),
        }
    }
}

impl GenomePort for MemStore {
    fn load_genome(&self) -> Result<Option<Genome>, ConfigError> {
        Ok(*self.genome.borrow())
    }

    fn save_genome(&self, genome: &Genome) -> Result<(), ConfigError> {
        *self.genome.borrow_mut() = Some(*genome);
        self.genome_saves.set(self.genome_saves.get() + 1);
        Ok(())
    }
}

impl ConfigPort for MemStore {
    fn load(&self) -> Result<RobotConfig, ConfigError> {
        Ok(self.config.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &RobotConfig) -> Result<(), ConfigError> {
        *self.config.borrow_mut() = Some(config.sanitized());
        self.config_saves.set(self.config_saves.get() + 1);
        Ok(())
    }
}

// ── Random source ─────────────────────────────────────────────

/// Replays a fixed script, then repeats its last value.
pub struct ScriptedRandom {
    script: VecDeque<u32>,
    last: u32,
}

#[allow(dead_code)]
impl ScriptedRandom {
    pub fn new(script: &[u32]) -> Self {
        Self {
            script: script.iter().copied().collect(),
            last: 0,
        }
    }

    /// Every coin flip comes up "left".
    pub fn always_left() -> Self {
        Self::new(&[1])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_u32(&mut self) -> u32 {
        if let Some(v) = self.script.pop_front() {
            self.last = v;
        }
        self.last
    }
}
