//! Motion control: abstract drive commands to per-wheel speeds.

pub mod motion;
