//! RGB status LED driver.
//!
//! Three LEDC PWM channels (CH2-4) drive a common-cathode RGB LED.
//! Writes are skipped when the colour is unchanged.

use crate::drivers::hw_init;
use crate::drivers::led_patterns::Rgb;

pub struct StatusLed {
    current: Option<Rgb>,
}

impl StatusLed {
    pub fn new() -> Self {
        Self { current: None }
    }

    pub fn set_colour(&mut self, colour: Rgb) {
        if self.current == Some(colour) {
            return;
        }
        let (r, g, b) = colour;
        hw_init::ledc_set(hw_init::LEDC_CH_LED_R, r);
        hw_init::ledc_set(hw_init::LEDC_CH_LED_G, g);
        hw_init::ledc_set(hw_init::LEDC_CH_LED_B, b);
        self.current = Some(colour);
    }

    pub fn off(&mut self) {
        self.set_colour((0, 0, 0));
    }

    pub fn current_colour(&self) -> Rgb {
        self.current.unwrap_or((0, 0, 0))
    }
}

impl Default for StatusLed {
    fn default() -> Self {
        Self::new()
    }
}
