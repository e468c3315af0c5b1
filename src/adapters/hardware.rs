//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the ultrasonic ranger, both wheel drivers and the status LED,
//! exposing them through [`SensorPort`] and [`ActuatorPort`].  This is the
//! only module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying drivers use cfg-gated simulation stubs.

use crate::app::ports::{ActuatorPort, SensorPort, Side};
use crate::config::RobotConfig;
use crate::drivers::hw_init;
use crate::drivers::motor::MotorDriver;
use crate::drivers::status_led::StatusLed;
use crate::drivers::ultrasonic::Ultrasonic;
use crate::pins;
use crate::sensors::light::LightCalibration;

const ADC_MAX: f32 = 4095.0;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    ranger: Ultrasonic,
    left_wheel: MotorDriver,
    right_wheel: MotorDriver,
    led: StatusLed,
    left_light: LightCalibration,
    right_light: LightCalibration,
}

impl HardwareAdapter {
    pub fn new(config: &RobotConfig) -> Self {
        let mut hw = Self {
            ranger: Ultrasonic::new(),
            left_wheel: MotorDriver::new(Side::Left),
            right_wheel: MotorDriver::new(Side::Right),
            led: StatusLed::new(),
            left_light: LightCalibration::default(),
            right_light: LightCalibration::default(),
        };
        hw.apply_config(config);
        hw
    }

    /// Pick up trim, inversion and LDR calibration from a new config.
    pub fn apply_config(&mut self, config: &RobotConfig) {
        self.left_wheel.set_calibration(config.left_trim, config.left_inverted);
        self.right_wheel.set_calibration(config.right_trim, config.right_inverted);
        self.left_light = LightCalibration::left(config);
        self.right_light = LightCalibration::right(config);
    }

    pub fn wheel(&self, side: Side) -> &MotorDriver {
        match side {
            Side::Left => &self.left_wheel,
            Side::Right => &self.right_wheel,
        }
    }

    pub fn led(&self) -> &StatusLed {
        &self.led
    }
}

/// Pack voltage from a raw battery-divider sample.
pub fn battery_volts(raw: u16) -> f32 {
    f32::from(raw) / ADC_MAX * pins::ADC_FULL_SCALE_V * pins::BATTERY_DIVIDER_RATIO
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_distance_cm(&mut self) -> u16 {
        self.ranger.read_cm()
    }

    fn read_light(&mut self, side: Side) -> f32 {
        match side {
            Side::Left => self.left_light.map(hw_init::adc1_read(hw_init::ADC1_CH_LDR_LEFT)),
            Side::Right => self.right_light.map(hw_init::adc1_read(hw_init::ADC1_CH_LDR_RIGHT)),
        }
    }

    fn read_battery_voltage(&mut self) -> f32 {
        battery_volts(hw_init::adc1_read(hw_init::ADC1_CH_BATTERY))
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_wheel_speed(&mut self, side: Side, magnitude: u8, forward: bool) {
        match side {
            Side::Left => self.left_wheel.set(magnitude, forward),
            Side::Right => self.right_wheel.set(magnitude, forward),
        }
    }

    fn stop_all_wheels(&mut self) {
        self.left_wheel.stop();
        self.right_wheel.stop();
    }

    fn set_status_color(&mut self, r: u8, g: u8, b: u8) {
        self.led.set_colour((r, g, b));
    }
}
