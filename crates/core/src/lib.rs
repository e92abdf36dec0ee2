//! Core functionality for the Beaconnet proximity mesh system.
//!
//! This crate provides the configuration, error, logging and shared-type
//! foundations used across the Beaconnet ecosystem.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{Config, KeysConfig, MeshConfig, RadioConfig};
pub use error::{CoreError, Result};
pub use types::{now_ms, now_secs, AdvMap};
