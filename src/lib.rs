//! Aura Mon console - Rust Implementation
//!
//! Operator console for a small fleet of addressable metering devices hosted
//! by the Aura Mon firmware.
//!
//! This library provides:
//! - Configuration sync engine (load, validate, debounce and persist edits)
//! - Live status polling joined to configuration by device name
//! - Device actions (locate, address broadcast) and firmware/file uploads
//! - Server-rendered operator page (Dioxus SSR over axum)

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod console;
#[cfg(feature = "server")]
pub mod ui;
