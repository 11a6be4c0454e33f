//! Shared UI components for the Dioxus-based operator page.

pub mod device_table;
pub mod drawers;
pub mod layout;
pub mod theme;
pub mod topbar;

pub use device_table::DeviceTable;
pub use drawers::{DeviceDrawer, UploadDrawerView};
pub use layout::Layout;
pub use theme::ThemeToggle;
pub use topbar::TopBar;
