//! Phototropism: steer toward the brighter side.

use crate::control::motion::MotionCommand;
use crate::genome::Genome;
use crate::power::PowerMode;
use crate::sensors::light::LightReading;

/// Imbalance below which the robot drives straight, to avoid jitter.
pub const DEADBAND: f32 = 0.05;
/// Largest steering correction applied to one wheel.
pub const MAX_CORRECTION: i16 = 100;

/// Cruising speed for the current power mode.
pub fn cruise_speed(genome: &Genome, mode: PowerMode) -> u8 {
    if mode.is_economy() {
        // 255 * 3 / 4 still fits in u8
        (u16::from(genome.base_speed) * 3 / 4) as u8
    } else {
        genome.base_speed
    }
}

/// Proportional steering command for one cycle of light seeking.
///
/// A brighter left side yields a positive delta, which slows the left
/// wheel and veers left.
pub fn steer(light: &LightReading, genome: &Genome, mode: PowerMode) -> MotionCommand {
    let base = cruise_speed(genome, mode);
    let error = light.imbalance();
    if error.abs() <= DEADBAND {
        return MotionCommand::Forward(base);
    }
    let correction = (error * genome.turn_sensitivity)
        .clamp(-f32::from(MAX_CORRECTION), f32::from(MAX_CORRECTION)) as i16;
    MotionCommand::Veer { base, delta: correction }
}
