//! Priority arbiter.
//!
//! A pure function of its inputs, strictly ordered and short-circuiting:
//!
//! ```text
//!   1. force idle latched           → IDLE
//!   2. dead                         → IDLE       (accounting continues)
//!   3. maneuver already running     → AVOIDING   (let the phase machine finish)
//!   4. obstacle, cooldown elapsed   → AVOIDING
//!   5. stuck                        → AVOIDING   (enters STUCK_ESCAPE)
//!   6. battery CRITICAL / SHUTDOWN  → IDLE
//!   7. energy < seek threshold      → SEEKING_LIGHT
//!   8. otherwise                    → IDLE       (explore)
//! ```
//!
//! Obstacle handling and power conservation always dominate light seeking.

use super::BehaviorState;
use crate::power::PowerMode;

/// Everything the arbiter looks at, gathered once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbiterInput {
    pub override_idle: bool,
    pub alive: bool,
    pub maneuver_active: bool,
    pub obstacle: bool,
    pub in_cooldown: bool,
    pub stuck: bool,
    pub power_mode: PowerMode,
    pub energy: f32,
    pub seek_threshold: f32,
}

/// What started an avoidance maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidTrigger {
    Obstacle,
    Stuck,
}

/// Why the robot is idle this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    Override,
    Dead,
    PowerConservation,
    /// Energy is full; the robot explores.
    Sated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Idle(IdleReason),
    SeekLight,
    /// `None` means an avoidance maneuver is already in progress.
    Avoid(Option<AvoidTrigger>),
}

impl Selection {
    pub const fn behavior(self) -> BehaviorState {
        match self {
            Self::Idle(_) => BehaviorState::Idle,
            Self::SeekLight => BehaviorState::SeekingLight,
            Self::Avoid(_) => BehaviorState::AvoidingObstacle,
        }
    }

    /// `true` when the robot should be roaming under its own control.
    pub const fn is_exploring(self) -> bool {
        matches!(self, Self::Idle(IdleReason::Sated))
    }
}

pub fn select(input: &ArbiterInput) -> Selection {
    if input.override_idle {
        return Selection::Idle(IdleReason::Override);
    }
    if !input.alive {
        return Selection::Idle(IdleReason::Dead);
    }
    if input.maneuver_active {
        return Selection::Avoid(None);
    }
    if input.obstacle && !input.in_cooldown {
        return Selection::Avoid(Some(AvoidTrigger::Obstacle));
    }
    if input.stuck {
        return Selection::Avoid(Some(AvoidTrigger::Stuck));
    }
    if input.power_mode.must_conserve() {
        return Selection::Idle(IdleReason::PowerConservation);
    }
    if input.energy < input.seek_threshold {
        return Selection::SeekLight;
    }
    Selection::Idle(IdleReason::Sated)
}
