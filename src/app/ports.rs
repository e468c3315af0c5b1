//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, wheels, event sinks, storage, entropy)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use crate::config::RobotConfig;
use crate::genome::Genome;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Which side of the chassis a wheel or light sensor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Read-side port: the domain calls this once per control cycle.
pub trait SensorPort {
    /// One raw ultrasonic range sample in cm.  A missing echo is reported
    /// as the max-range sentinel, never as an error.
    fn read_distance_cm(&mut self) -> u16;

    /// Calibrated brightness for one LDR, already mapped onto [0, 1].
    fn read_light(&mut self, side: Side) -> f32;

    /// Battery pack voltage in volts.
    fn read_battery_voltage(&mut self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command wheels and the LED.
pub trait ActuatorPort {
    /// Drive one wheel at `magnitude` (0–255) in the given direction.
    fn set_wheel_speed(&mut self, side: Side, magnitude: u8, forward: bool);

    /// Stop both wheels immediately.
    fn stop_all_wheels(&mut self);

    /// Set the RGB status LED colour.
    fn set_status_color(&mut self, r: u8, g: u8, b: u8);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, web
/// dashboard push, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Random source (driven adapter: entropy → domain)
// ───────────────────────────────────────────────────────────────

/// Injectable pseudo-random source.
///
/// Turn-direction choices and genome rolls draw from here so tests can
/// script the sequence.
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;

    /// Uniform integer in `[lo, hi)`.  Returns `lo` for an empty range.
    fn range_i32(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo) as u32;
        lo + (self.next_u32() % span) as i32
    }

    /// Fair coin flip.
    fn coin(&mut self) -> bool {
        self.next_u32() & 1 == 1
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the robot configuration.
///
/// Implementations clamp through [`RobotConfig::sanitized`] before writing;
/// out-of-range values never reach flash.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`RobotConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<RobotConfig, ConfigError>;

    /// Clamp and persist configuration.
    fn save(&self, config: &RobotConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Genome port (driven adapter: domain ↔ persisted genome record)
// ───────────────────────────────────────────────────────────────

/// Save/load contract for the fixed-size genome record.
pub trait GenomePort {
    /// `Ok(None)` when nothing has been stored yet.
    fn load_genome(&self) -> Result<Option<Genome>, ConfigError>;

    fn save_genome(&self, genome: &Genome) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage underneath the config and genome records.
///
/// Keys are namespaced to prevent collisions between subsystems.  Write
/// operations MUST be atomic; the ESP-IDF NVS API guarantees this per
/// commit and the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] and [`GenomePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored record failed deserialization.
    Corrupted,
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Full => Self::StorageFull,
            StorageError::NotFound | StorageError::IoError => Self::IoError,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "record corrupted"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
