//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (serial
//! console, web dashboard) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.
//! Both surfaces produce the same commands, so they mutate the same
//! genome and configuration.

use core::str::FromStr;

use crate::control::motion::MotionCommand;
use crate::genome::GenomeField;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Report the status snapshot.
    Status,
    /// Report the status snapshot as the published JSON object.
    StatusJson,
    /// List the command surface.
    Help,
    /// Read one tunable.
    Get(Tunable),
    /// Write one tunable.  Out-of-range values are clamped, never rejected.
    Set(Tunable, f32),
    /// Small random perturbation of the energy genes, generation + 1.
    Mutate,
    /// Full re-roll of every gene plus a life reset.
    Randomize,
    /// Energy back to 100, alive, timer restarted.
    Reset,
    /// Persist genome and configuration now.
    Save,
    /// Pin the behaviour to IDLE until released.
    ForceIdle,
    /// Release the manual override.
    ForceAuto,
    /// Stop everything now and latch force-idle.
    EmergencyStop,
    /// Manual drive; only accepted while forced idle.
    Drive(DriveCommand),
}

/// Named parameters reachable through `get` / `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunable {
    Genome(GenomeField),
    /// Session-only energy decay rate; not persisted.
    EnergyDecay,
    StopDistance,
    WarnDistance,
}

impl Tunable {
    pub const ALL: [Self; 7] = [
        Self::Genome(GenomeField::LightThreshold),
        Self::Genome(GenomeField::Efficiency),
        Self::Genome(GenomeField::TurnSensitivity),
        Self::Genome(GenomeField::BaseSpeed),
        Self::EnergyDecay,
        Self::StopDistance,
        Self::WarnDistance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Genome(field) => field.name(),
            Self::EnergyDecay => "energy_decay",
            Self::StopDistance => "stop_distance",
            Self::WarnDistance => "warn_distance",
        }
    }
}

impl FromStr for Tunable {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy_decay" | "decay" => Ok(Self::EnergyDecay),
            "stop_distance" => Ok(Self::StopDistance),
            "warn_distance" => Ok(Self::WarnDistance),
            other => other.parse::<GenomeField>().map(Self::Genome),
        }
    }
}

/// Manual drive verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveVerb {
    Forward,
    Backward,
    Left,
    Right,
    SpinCw,
    SpinCcw,
    Crawl,
    Run,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveCommand {
    pub verb: DriveVerb,
    /// Explicit speed; `None` uses the genome's base speed.
    pub speed: Option<u8>,
    /// Ramp instead of jumping.
    pub smooth: bool,
}

impl DriveCommand {
    pub const fn immediate(verb: DriveVerb) -> Self {
        Self { verb, speed: None, smooth: false }
    }

    pub const fn smooth(verb: DriveVerb) -> Self {
        Self { verb, speed: None, smooth: true }
    }

    pub fn to_motion(self, base_speed: u8) -> MotionCommand {
        let s = self.speed.unwrap_or(base_speed);
        match self.verb {
            DriveVerb::Forward => MotionCommand::Forward(s),
            DriveVerb::Backward => MotionCommand::Backward(s),
            DriveVerb::Left => MotionCommand::TurnLeft(s),
            DriveVerb::Right => MotionCommand::TurnRight(s),
            DriveVerb::SpinCw => MotionCommand::SpinCw(s),
            DriveVerb::SpinCcw => MotionCommand::SpinCcw(s),
            DriveVerb::Crawl => MotionCommand::Crawl,
            DriveVerb::Run => MotionCommand::Run,
            DriveVerb::Stop => MotionCommand::Stop,
        }
    }
}
