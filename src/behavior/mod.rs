//! Top-level behaviour selection.
//!
//! Exactly one [`BehaviorState`] is active per control cycle.  The
//! [`arbiter`] picks it fresh every cycle from the filtered sensors, the
//! energy balance and the battery mode; [`seeking`] turns the light pair
//! into a steering command.  Obstacle avoidance itself lives in the
//! phase machine under [`crate::fsm`].

pub mod arbiter;
pub mod seeking;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    Idle,
    SeekingLight,
    AvoidingObstacle,
}

impl BehaviorState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::SeekingLight => "SEEKING_LIGHT",
            Self::AvoidingObstacle => "AVOIDING_OBSTACLE",
        }
    }
}

impl core::fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
