//! Mock servers for integration testing
//!
//! Simulates the metering firmware's HTTP API so the console can be tested
//! end to end without hardware.

pub mod firmware;

pub use firmware::{MockFirmware, RecordedUpload};
