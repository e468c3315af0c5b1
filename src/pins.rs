//! GPIO / peripheral pin assignments for the EMBER chassis (ESP32-WROOM).
//!
//! Single source of truth, every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Motor driver (TB6612FNG dual H-bridge)
// ---------------------------------------------------------------------------

/// Left wheel direction inputs.
pub const MOTOR_LEFT_IN1_GPIO: i32 = 15;
pub const MOTOR_LEFT_IN2_GPIO: i32 = 2;
/// Right wheel direction inputs.
pub const MOTOR_RIGHT_IN1_GPIO: i32 = 16;
pub const MOTOR_RIGHT_IN2_GPIO: i32 = 17;
/// PWM speed inputs.
pub const MOTOR_LEFT_PWM_GPIO: i32 = 5;
pub const MOTOR_RIGHT_PWM_GPIO: i32 = 4;
/// Driver standby, active LOW.  Held HIGH while the firmware runs.
pub const MOTOR_STBY_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Ultrasonic range finder (HC-SR04)
// ---------------------------------------------------------------------------

pub const US_TRIGGER_GPIO: i32 = 26;
pub const US_ECHO_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Analog inputs, must be ADC1 (GPIO 32-39), ADC2 is unusable with WiFi
// ---------------------------------------------------------------------------

/// Left LDR, GPIO 34 = ADC1 channel 6.
pub const LDR_LEFT_GPIO: i32 = 34;
/// Right LDR, GPIO 35 = ADC1 channel 7.
pub const LDR_RIGHT_GPIO: i32 = 35;
/// Battery divider tap, GPIO 32 = ADC1 channel 4.
pub const BATTERY_SENSE_GPIO: i32 = 32;

/// Pack voltage = tap voltage × this ratio (20 kΩ / 10 kΩ divider).
pub const BATTERY_DIVIDER_RATIO: f32 = 3.0;
/// ADC full-scale voltage at 12 dB attenuation.
pub const ADC_FULL_SCALE_V: f32 = 3.3;

// ---------------------------------------------------------------------------
// Status LED (discrete common-cathode RGB)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 23;
pub const LED_G_GPIO: i32 = 22;
pub const LED_B_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// Motor PWM frequency.
pub const MOTOR_PWM_FREQ_HZ: u32 = 5_000;
/// RGB status LED frequency.
pub const LED_PWM_FREQ_HZ: u32 = 1_000;
