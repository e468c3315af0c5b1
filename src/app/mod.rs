//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the orchestration rules for EMBER: the per-cycle
//! pipeline, the operator command surface and the events it reports.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod cli;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
