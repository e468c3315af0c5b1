//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to              |
//! |-------------|---------------------|--------------------------|
//! | `hardware`  | SensorPort          | ESP32 ADC, HC-SR04       |
//! |             | ActuatorPort        | TB6612 wheels, RGB LED   |
//! | `log_sink`  | EventSink           | Serial log output        |
//! | `nvs`       | ConfigPort          | NVS / in-memory store    |
//! |             | GenomePort          |                          |
//! |             | StoragePort         |                          |
//! | `rng`       | RandomSource        | WyRand, hardware seed    |
//! | `console`   | -                   | UART line input          |
//! | `time`      | -                   | ESP32 system timer       |

pub mod console;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod rng;
pub mod time;
