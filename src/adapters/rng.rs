//! Pseudo-random source backed by WyRand.
//!
//! Seeded from the hardware RNG on the ESP32 (RF noise once the radio
//! subsystem has started, SAR ADC noise otherwise), or from the clock on
//! the host.  A fixed seed gives a reproducible sequence for simulation.

use nanorand::{Rng, WyRand};

use crate::app::ports::RandomSource;

pub struct WyRandSource {
    inner: WyRand,
}

impl WyRandSource {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: WyRand::new_seed(seed),
        }
    }

    pub fn from_hardware() -> Self {
        Self::new(hardware_seed())
    }
}

impl RandomSource for WyRandSource {
    fn next_u32(&mut self) -> u32 {
        self.inner.generate::<u32>()
    }
}

#[cfg(target_os = "espidf")]
pub fn hardware_seed() -> u64 {
    // SAFETY: esp_random() is callable from any task.
    let (hi, lo) = unsafe { (esp_idf_svc::sys::esp_random(), esp_idf_svc::sys::esp_random()) };
    (u64::from(hi) << 32) | u64::from(lo)
}

#[cfg(not(target_os = "espidf"))]
pub fn hardware_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0x5eed, |d| d.as_nanos() as u64)
}
