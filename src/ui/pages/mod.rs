//! Page components for the Dioxus-based operator page.

pub mod console;

pub use console::ConsolePage;
