// LogKeeper - platform/mod.rs
//
// Platform abstraction layer: filesystem helpers and configuration.

pub mod config;
pub mod fs;
