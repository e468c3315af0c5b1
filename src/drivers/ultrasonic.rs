//! HC-SR04 ultrasonic range finder.
//!
//! A 10 µs trigger pulse starts a measurement; the echo pin then stays
//! high for a time proportional to the round trip.  The read is a short
//! busy-wait bounded by [`ECHO_TIMEOUT_US`] (about 5 m of travel).
//!
//! On the host the reading comes from an atomic that tests set directly.

use crate::error::SensorError;
use crate::sensors::distance::MAX_RANGE_CM;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

/// Longest we wait for either echo edge.
pub const ECHO_TIMEOUT_US: i64 = 30_000;
/// Round-trip microseconds per centimetre.
pub const US_PER_CM: i64 = 58;

pub struct Ultrasonic {
    last_cm: u16,
}

impl Ultrasonic {
    pub fn new() -> Self {
        Self {
            last_cm: MAX_RANGE_CM,
        }
    }

    /// One measurement, or the max-range sentinel when nothing answers.
    pub fn read_cm(&mut self) -> u16 {
        let cm = match self.measure() {
            Ok(cm) => cm.min(MAX_RANGE_CM),
            Err(e) => {
                log::trace!("ultrasonic: {}", e);
                MAX_RANGE_CM
            }
        };
        self.last_cm = cm;
        cm
    }

    pub fn last_cm(&self) -> u16 {
        self.last_cm
    }

    #[cfg(target_os = "espidf")]
    fn measure(&mut self) -> Result<u16, SensorError> {
        hw_init::gpio_write(pins::US_TRIGGER_GPIO, false);
        hw_init::delay_us(2);
        hw_init::gpio_write(pins::US_TRIGGER_GPIO, true);
        hw_init::delay_us(10);
        hw_init::gpio_write(pins::US_TRIGGER_GPIO, false);

        let start = hw_init::micros();
        while !hw_init::gpio_read(pins::US_ECHO_GPIO) {
            if hw_init::micros() - start > ECHO_TIMEOUT_US {
                return Err(SensorError::EchoTimeout);
            }
        }

        let rise = hw_init::micros();
        while hw_init::gpio_read(pins::US_ECHO_GPIO) {
            if hw_init::micros() - rise > ECHO_TIMEOUT_US {
                return Err(SensorError::EchoStuckHigh);
            }
        }

        let width = hw_init::micros() - rise;
        u16::try_from(width / US_PER_CM).map_err(|_| SensorError::OutOfRange)
    }

    #[cfg(not(target_os = "espidf"))]
    fn measure(&mut self) -> Result<u16, SensorError> {
        match SIM_DISTANCE_CM.load(core::sync::atomic::Ordering::Relaxed) {
            0 => Err(SensorError::EchoTimeout),
            cm => Ok(cm),
        }
    }
}

impl Default for Ultrasonic {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated range; zero means "no echo".
#[cfg(not(target_os = "espidf"))]
static SIM_DISTANCE_CM: core::sync::atomic::AtomicU16 =
    core::sync::atomic::AtomicU16::new(MAX_RANGE_CM);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_distance(cm: u16) {
    SIM_DISTANCE_CM.store(cm, core::sync::atomic::Ordering::Relaxed);
}
