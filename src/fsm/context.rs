//! Shared mutable context threaded through every phase handler.
//!
//! `FsmContext` is the blackboard the avoidance phases read from and write
//! to: the clock, the latest sensor snapshot, the energy and battery state
//! that scale maneuver speed, the tunables, and the motion command the
//! phase wants applied this cycle.

use crate::behavior::arbiter::AvoidTrigger;
use crate::config::RobotConfig;
use crate::control::motion::MotionCommand;
use crate::power::PowerMode;
use crate::sensors::SensorSnapshot;

/// Energy (percent) below which maneuvers run at reduced speed.
pub const LOW_ENERGY_PERCENT: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Spin-in-place command that turns this way.
    pub const fn spin(self, speed: u8) -> MotionCommand {
        match self {
            Self::Left => MotionCommand::SpinCcw(speed),
            Self::Right => MotionCommand::SpinCw(speed),
        }
    }

    pub const fn from_coin(left: bool) -> Self {
        if left { Self::Left } else { Self::Right }
    }
}

/// Sub-steps of the TURN phase when scanning is enabled.
///
/// ```text
///  LookLeft ──▶ LookRight (2×) ──▶ Center ──▶ Turning
///   sample left     sample right    compare
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    LookLeft,
    LookRight,
    Center,
    Turning,
}

/// Sub-steps of the STUCK_ESCAPE phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStep {
    Reverse,
    PauseAfterReverse,
    Spin,
    PauseAfterSpin,
}

/// The shared context passed to every phase handler function.
pub struct FsmContext {
    // -- Timing --
    /// Current uptime (ms).  Set by the caller before each tick.
    pub now_ms: u64,
    /// Uptime at which the current phase was entered.
    pub phase_entered_ms: u64,
    /// Uptime at which the current sub-step (scan or escape) began.
    pub step_entered_ms: u64,

    // -- Inputs --
    pub sensors: SensorSnapshot,
    pub energy: f32,
    pub power_mode: PowerMode,
    pub config: RobotConfig,
    /// Pending request to start a maneuver; consumed by the NONE phase.
    pub trigger: Option<AvoidTrigger>,
    /// Fresh random bit supplied by the caller before every tick.
    /// `true` picks left when a direction has to be guessed.
    pub coin_left: bool,

    // -- Output --
    /// Motion the current phase wants applied, taken by the caller.
    pub motion: Option<MotionCommand>,

    // -- Maneuver state --
    pub direction: TurnDirection,
    pub scan_step: ScanStep,
    pub scan_left_cm: u16,
    pub scan_right_cm: u16,
    pub escape_step: EscapeStep,
    /// Failed VERIFY checks in the current maneuver.
    pub retries: u8,
}

impl FsmContext {
    pub fn new(config: RobotConfig) -> Self {
        Self {
            now_ms: 0,
            phase_entered_ms: 0,
            step_entered_ms: 0,
            sensors: SensorSnapshot::default(),
            energy: 100.0,
            power_mode: PowerMode::Normal,
            config,
            trigger: None,
            coin_left: true,
            motion: None,
            direction: TurnDirection::Left,
            scan_step: ScanStep::Turning,
            scan_left_cm: 0,
            scan_right_cm: 0,
            escape_step: EscapeStep::Reverse,
            retries: 0,
        }
    }

    /// Milliseconds since the current phase was entered.
    pub fn ms_in_phase(&self) -> u64 {
        self.now_ms.saturating_sub(self.phase_entered_ms)
    }

    /// Milliseconds since the current sub-step began.
    pub fn ms_in_step(&self) -> u64 {
        self.now_ms.saturating_sub(self.step_entered_ms)
    }

    pub fn begin_step(&mut self) {
        self.step_entered_ms = self.now_ms;
    }

    /// Backup speed, reduced by a quarter under low energy or economy power.
    pub fn backup_speed(&self) -> u8 {
        let full = self.config.backup_speed;
        if self.energy < LOW_ENERGY_PERCENT || self.power_mode.is_economy() {
            (u16::from(full) * 3 / 4) as u8
        } else {
            full
        }
    }

    /// Distance the robot must see ahead to call the maneuver done.
    pub fn clear_distance_cm(&self) -> u16 {
        self.config
            .stop_distance_cm
            .saturating_add(self.config.clear_margin_cm)
    }

    pub fn drive(&mut self, cmd: MotionCommand) {
        self.motion = Some(cmd);
    }
}
