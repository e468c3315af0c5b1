//! Motion command layer.
//!
//! Turns an abstract [`MotionCommand`] into a signed [`WheelCommand`]
//! (one value per wheel, magnitude 0–255, sign = direction) and ramps the
//! wheels toward it without blocking:
//!
//! ```text
//!   smooth(cmd) ──▶ target
//!   tick(now)   ──▶ every ramp_interval_ms, each wheel moves ramp_step
//!                   toward its target (through zero on reversal)
//! ```
//!
//! Immediate commands and [`MotionController::emergency_stop`] bypass the
//! ramp and take effect on the next [`MotionController::tick`].

use crate::config::RobotConfig;

pub const MAX_WHEEL_SPEED: i16 = 255;

/// Signed per-wheel speed.  Positive drives the wheel forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelCommand {
    pub left: i16,
    pub right: i16,
}

impl WheelCommand {
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub const fn new(left: i16, right: i16) -> Self {
        Self { left, right }
    }

    fn clamped(self) -> Self {
        Self {
            left: self.left.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
            right: self.right.clamp(-MAX_WHEEL_SPEED, MAX_WHEEL_SPEED),
        }
    }

    pub const fn is_stopped(self) -> bool {
        self.left == 0 && self.right == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Stop,
    Forward(u8),
    Backward(u8),
    /// Arc left: left wheel at half speed.
    TurnLeft(u8),
    /// Arc right: right wheel at half speed.
    TurnRight(u8),
    /// Spin in place clockwise (left forward, right backward).
    SpinCw(u8),
    SpinCcw(u8),
    /// Forward at the configured crawl speed.
    Crawl,
    /// Forward at the configured maximum speed.
    Run,
    /// Proportional steering.  Positive `delta` slows the left wheel
    /// (veer left, like [`TurnLeft`](Self::TurnLeft)), negative slows the
    /// right wheel (veer right).
    Veer { base: u8, delta: i16 },
}

impl MotionCommand {
    pub fn to_wheels(self, profile: &MotionProfile) -> WheelCommand {
        let s = |v: u8| i16::from(v);
        let cmd = match self {
            Self::Stop => WheelCommand::STOP,
            Self::Forward(v) => WheelCommand::new(s(v), s(v)),
            Self::Backward(v) => WheelCommand::new(-s(v), -s(v)),
            Self::TurnLeft(v) => WheelCommand::new(s(v) / 2, s(v)),
            Self::TurnRight(v) => WheelCommand::new(s(v), s(v) / 2),
            Self::SpinCw(v) => WheelCommand::new(s(v), -s(v)),
            Self::SpinCcw(v) => WheelCommand::new(-s(v), s(v)),
            Self::Crawl => WheelCommand::new(s(profile.crawl_speed), s(profile.crawl_speed)),
            Self::Run => WheelCommand::new(s(profile.max_speed), s(profile.max_speed)),
            Self::Veer { base, delta } => {
                let (mut left, mut right) = (s(base), s(base));
                if delta > 0 {
                    left -= delta;
                } else {
                    right += delta;
                }
                WheelCommand::new(
                    left.clamp(0, MAX_WHEEL_SPEED),
                    right.clamp(0, MAX_WHEEL_SPEED),
                )
            }
        };
        cmd.clamped()
    }
}

/// Speed and ramp settings taken from [`RobotConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionProfile {
    pub crawl_speed: u8,
    pub max_speed: u8,
    pub ramp_step: u8,
    pub ramp_interval_ms: u32,
}

impl From<&RobotConfig> for MotionProfile {
    fn from(cfg: &RobotConfig) -> Self {
        Self {
            crawl_speed: cfg.crawl_speed,
            max_speed: cfg.max_speed,
            ramp_step: cfg.ramp_step.max(1),
            ramp_interval_ms: cfg.ramp_interval_ms,
        }
    }
}

pub struct MotionController {
    profile: MotionProfile,
    target: WheelCommand,
    output: WheelCommand,
    last_step_ms: Option<u64>,
}

impl MotionController {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            profile,
            target: WheelCommand::STOP,
            output: WheelCommand::STOP,
            last_step_ms: None,
        }
    }

    pub fn set_profile(&mut self, profile: MotionProfile) {
        self.profile = profile;
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    /// Jump straight to `cmd`.
    pub fn command(&mut self, cmd: MotionCommand) {
        let wheels = cmd.to_wheels(&self.profile);
        self.target = wheels;
        self.output = wheels;
        self.last_step_ms = None;
    }

    /// Ramp toward `cmd`.  Re-issuing the same command keeps the ramp going.
    pub fn smooth(&mut self, cmd: MotionCommand) {
        self.target = cmd.to_wheels(&self.profile);
    }

    pub fn smooth_stop(&mut self) {
        self.smooth(MotionCommand::Stop);
    }

    /// Cancel any ramp and stop both wheels now.
    pub fn emergency_stop(&mut self) {
        self.command(MotionCommand::Stop);
    }

    /// Advance the ramp and return the wheel speeds for this cycle.
    pub fn tick(&mut self, now_ms: u64) -> WheelCommand {
        if self.output == self.target {
            return self.output;
        }
        let due = self.last_step_ms.is_none_or(|last| {
            now_ms.saturating_sub(last) >= u64::from(self.profile.ramp_interval_ms)
        });
        if due {
            let step = i16::from(self.profile.ramp_step);
            self.output = WheelCommand::new(
                step_toward(self.output.left, self.target.left, step),
                step_toward(self.output.right, self.target.right, step),
            );
            self.last_step_ms = Some(now_ms);
        }
        self.output
    }

    pub fn output(&self) -> WheelCommand {
        self.output
    }

    pub fn target(&self) -> WheelCommand {
        self.target
    }

    pub fn is_moving(&self) -> bool {
        !self.output.is_stopped()
    }

    pub fn is_ramping(&self) -> bool {
        self.output != self.target
    }
}

fn step_toward(current: i16, target: i16, step: i16) -> i16 {
    if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    }
}
