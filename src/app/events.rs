//! Outbound application events and command replies.
//!
//! The [`AppService`](super::service::AppService) emits events through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, push to a web
//! dashboard, and so on.

use serde::Serialize;

use crate::behavior::BehaviorState;
use crate::fsm::AvoidPhase;
use crate::genome::Genome;
use crate::power::PowerMode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started.
    Started { bot_id: u8, generation: u32 },

    /// The arbiter picked a different top-level behaviour.
    BehaviorChanged { from: BehaviorState, to: BehaviorState },

    /// The avoidance machine moved between phases.
    AvoidPhaseChanged { from: AvoidPhase, to: AvoidPhase },

    /// Energy ran out.  Carries the length of the life that just ended.
    Died { alive_time_s: u64 },

    /// Energy rose above zero again.
    Revived,

    /// The battery crossed a mode boundary.
    PowerModeChanged { from: PowerMode, to: PowerMode, voltage: f32 },

    /// Manual override toggled.
    OverrideChanged { idle: bool },

    EmergencyStop,

    /// The genome was mutated, re-rolled or edited.
    GenomeChanged(Genome),

    /// Periodic telemetry snapshot.
    Telemetry(StatusSnapshot),
}

/// The status object reported to the console, the dashboard and telemetry.
///
/// Serialises to the JSON object
/// `{bot_id, generation, alive, energy, light_level, light_left,
/// light_right, distance_cm, battery_v, battery_pct, power_mode,
/// alive_time_s}`; the remaining fields are for local display only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub bot_id: u8,
    pub generation: u32,
    pub alive: bool,
    pub energy: f32,
    pub light_level: f32,
    pub light_left: f32,
    pub light_right: f32,
    pub distance_cm: u16,
    pub battery_v: f32,
    pub battery_pct: f32,
    /// Numeric [`PowerMode`] discriminant.
    pub power_mode: u8,
    pub alive_time_s: u64,

    #[serde(skip)]
    pub behavior: BehaviorState,
    #[serde(skip)]
    pub phase: AvoidPhase,
    #[serde(skip)]
    pub stuck: bool,
    #[serde(skip)]
    pub override_idle: bool,
}

impl StatusSnapshot {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Result of a successfully handled [`AppCommand`](super::commands::AppCommand).
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Status(StatusSnapshot),
    StatusJson(StatusSnapshot),
    Help,
    Value { name: &'static str, value: f32 },
    Genome(Genome),
    Ok(&'static str),
}
