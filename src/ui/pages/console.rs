//! Console page component.
//!
//! Shows the device table, save status and whichever drawer is open. While
//! no drawer is open the page reloads itself on the poll period so live
//! metrics stay current.

use dioxus::prelude::*;

use crate::console::{ConsoleView, DrawerView};
use crate::ui::components::{DeviceDrawer, DeviceTable, Layout, TopBar, UploadDrawerView};

fn refresh_script(period_ms: u64) -> String {
    format!("setTimeout(function() {{ window.location.reload(); }}, {period_ms});")
}

#[derive(Props, Clone, PartialEq)]
pub struct ConsolePageProps {
    pub view: ConsoleView,
    /// Auto-refresh period while idle
    pub refresh_ms: u64,
}

/// Console page component.
#[component]
pub fn ConsolePage(props: ConsolePageProps) -> Element {
    let view = &props.view;
    let drawer_open = !matches!(view.drawer, DrawerView::Closed) || view.uploads.open;
    let scripts = (!drawer_open).then(|| refresh_script(props.refresh_ms));

    let count_label = view.device_count_label();
    let save_class = format!("save-status {}", view.save_status.variant().as_str());
    let save_text = view.save_status.text();

    rsx! {
        Layout {
            title: "Devices".to_string(),
            scripts: scripts,

            TopBar { version: view.version.clone(), live: view.live }

            section { class: "card",
                div { class: "card-header",
                    h1 {
                        "Devices "
                        span { id: "device-count", class: "device-count", "{count_label}" }
                    }
                    span { id: "save-status", class: "{save_class}", "{save_text}" }
                }

                DeviceTable { rows: view.rows.clone(), locked: drawer_open }

                form { method: "post", action: "/ui/session/add",
                    button {
                        id: "add-device",
                        r#type: "submit",
                        disabled: !view.can_add || drawer_open,
                        "+ Add device"
                    }
                }
            }

            if let DrawerView::Open { adding, draft, .. } = &view.drawer {
                DeviceDrawer { adding: *adding, draft: draft.clone() }
            }
            if view.uploads.open {
                UploadDrawerView { state: view.uploads }
            }
        }
    }
}
