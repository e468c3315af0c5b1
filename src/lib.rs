//! EMBER firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod behavior;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod genome;
pub mod life;
pub mod power;
pub mod sensors;

// Hardware-facing layers; the ESP-IDF paths are cfg-gated inside and the
// host builds get in-memory simulations.
pub mod adapters;
pub mod drivers;
pub mod pins;
