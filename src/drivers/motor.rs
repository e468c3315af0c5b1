//! Wheel motor driver (one channel of a TB6612FNG H-bridge).
//!
//! IN1/IN2 select direction, a LEDC channel on the PWM pin sets speed.
//! Per-wheel trim and inversion are applied here so the domain can speak
//! in terms of "left forward at 180" without caring about wiring.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM and GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use crate::app::ports::Side;
use crate::drivers::hw_init;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Stopped,
    Running { duty: u8, dir: Direction },
}

/// Wiring of one wheel channel.
#[derive(Debug, Clone, Copy)]
struct Channel {
    in1: i32,
    in2: i32,
    ledc: u32,
}

impl Channel {
    fn for_side(side: Side) -> Self {
        match side {
            Side::Left => Self {
                in1: pins::MOTOR_LEFT_IN1_GPIO,
                in2: pins::MOTOR_LEFT_IN2_GPIO,
                ledc: hw_init::LEDC_CH_MOTOR_LEFT,
            },
            Side::Right => Self {
                in1: pins::MOTOR_RIGHT_IN1_GPIO,
                in2: pins::MOTOR_RIGHT_IN2_GPIO,
                ledc: hw_init::LEDC_CH_MOTOR_RIGHT,
            },
        }
    }
}

pub struct MotorDriver {
    side: Side,
    channel: Channel,
    trim: i16,
    inverted: bool,
    state: MotorState,
}

impl MotorDriver {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            channel: Channel::for_side(side),
            trim: 0,
            inverted: false,
            state: MotorState::Stopped,
        }
    }

    /// Signed duty offset added to every non-zero command, plus a
    /// direction swap for a motor wired backwards.
    pub fn set_calibration(&mut self, trim: i16, inverted: bool) {
        self.trim = trim;
        self.inverted = inverted;
    }

    /// Drive at `magnitude` (0–255).  Zero stops the wheel.
    pub fn set(&mut self, magnitude: u8, forward: bool) {
        if magnitude == 0 {
            self.stop();
            return;
        }

        let duty = (i16::from(magnitude) + self.trim).clamp(0, 255) as u8;
        if duty == 0 {
            self.stop();
            return;
        }

        let dir = if forward != self.inverted {
            Direction::Forward
        } else {
            Direction::Reverse
        };
        self.set_direction_hw(dir);
        hw_init::ledc_set(self.channel.ledc, duty);
        self.state = MotorState::Running { duty, dir };
    }

    /// Coast: both direction inputs low, duty zero.
    pub fn stop(&mut self) {
        hw_init::gpio_write(self.channel.in1, false);
        hw_init::gpio_write(self.channel.in2, false);
        hw_init::ledc_set(self.channel.ledc, 0);
        self.state = MotorState::Stopped;
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, MotorState::Running { .. })
    }

    fn set_direction_hw(&self, dir: Direction) {
        let forward = dir == Direction::Forward;
        hw_init::gpio_write(self.channel.in1, forward);
        hw_init::gpio_write(self.channel.in2, !forward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_magnitude_stops() {
        let mut m = MotorDriver::new(Side::Left);
        m.set(120, true);
        assert!(m.is_running());
        m.set(0, true);
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn trim_is_added_and_clamped() {
        let mut m = MotorDriver::new(Side::Right);
        m.set_calibration(10, false);
        m.set(250, true);
        assert_eq!(m.state(), MotorState::Running { duty: 255, dir: Direction::Forward });

        m.set_calibration(-20, false);
        m.set(15, true);
        assert_eq!(m.state(), MotorState::Stopped);
    }

    #[test]
    fn inversion_swaps_direction() {
        let mut m = MotorDriver::new(Side::Left);
        m.set_calibration(0, true);
        m.set(100, true);
        assert_eq!(m.state(), MotorState::Running { duty: 100, dir: Direction::Reverse });
        m.set(100, false);
        assert_eq!(m.state(), MotorState::Running { duty: 100, dir: Direction::Forward });
    }
}
