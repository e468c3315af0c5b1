//! Twin-LDR light filter.
//!
//! Each side keeps a five-sample moving average.  Light changes slowly
//! compared with range echoes, so a mean is enough here.

use heapless::HistoryBuffer;

use crate::config::RobotConfig;

pub const WINDOW: usize = 5;

/// Raw ADC to [0, 1] mapping for one LDR divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCalibration {
    /// ADC reading in darkness.
    pub dark_adc: u16,
    /// ADC reading under the brightest expected source.
    pub bright_adc: u16,
}

impl Default for LightCalibration {
    fn default() -> Self {
        Self {
            dark_adc: 200,
            bright_adc: 3800,
        }
    }
}

impl LightCalibration {
    pub fn left(c: &RobotConfig) -> Self {
        Self {
            dark_adc: c.light_left_dark_adc,
            bright_adc: c.light_left_bright_adc,
        }
    }

    pub fn right(c: &RobotConfig) -> Self {
        Self {
            dark_adc: c.light_right_dark_adc,
            bright_adc: c.light_right_bright_adc,
        }
    }

    /// Linear map of a raw sample onto [0, 1], clamped.
    pub fn map(&self, raw_adc: u16) -> f32 {
        let span = f32::from(self.bright_adc) - f32::from(self.dark_adc);
        if span <= 0.0 {
            return 0.0;
        }
        ((f32::from(raw_adc) - f32::from(self.dark_adc)) / span).clamp(0.0, 1.0)
    }
}

/// Filtered brightness pair, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightReading {
    pub left: f32,
    pub right: f32,
}

impl LightReading {
    /// Overall ambient light, used by the energy model.
    pub fn ambient(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    /// Signed imbalance; positive when the left side is brighter.
    pub fn imbalance(&self) -> f32 {
        self.left - self.right
    }
}

pub struct LightFilter {
    left: HistoryBuffer<f32, WINDOW>,
    right: HistoryBuffer<f32, WINDOW>,
    reading: LightReading,
}

impl Default for LightFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl LightFilter {
    pub fn new() -> Self {
        Self {
            left: HistoryBuffer::new(),
            right: HistoryBuffer::new(),
            reading: LightReading::default(),
        }
    }

    /// Push one calibrated sample per side and return the moving averages.
    pub fn update(&mut self, left: f32, right: f32) -> LightReading {
        self.left.write(sanitize(left));
        self.right.write(sanitize(right));
        self.reading = LightReading {
            left: mean(self.left.as_slice()),
            right: mean(self.right.as_slice()),
        };
        self.reading
    }

    pub fn reading(&self) -> LightReading {
        self.reading
    }
}

fn sanitize(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}
