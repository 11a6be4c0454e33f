//! Device table: configuration rows joined with live metrics.

use dioxus::prelude::*;

use crate::console::DeviceRow;

#[derive(Props, Clone, PartialEq)]
pub struct DeviceTableProps {
    pub rows: Vec<DeviceRow>,
    /// Row actions are disabled while a drawer is open
    #[props(default)]
    pub locked: bool,
}

#[component]
pub fn DeviceTable(props: DeviceTableProps) -> Element {
    rsx! {
        table { class: "device-table", aria_label: "Device configuration",
            thead {
                tr {
                    th {}
                    th { "Name" }
                    th { "Volts" }
                    th { "Power" }
                    th { "Actions" }
                }
            }
            tbody { id: "devices-body",
                for row in props.rows.iter() {
                    DeviceRowView { key: "{row.index}", row: row.clone(), locked: props.locked }
                }
            }
        }
        if props.rows.is_empty() {
            p { id: "empty-state", class: "empty-state",
                "No devices configured yet. Add a device to get started."
            }
        }
    }
}

#[derive(Props, Clone, PartialEq)]
struct DeviceRowViewProps {
    row: DeviceRow,
    locked: bool,
}

#[component]
fn DeviceRowView(props: DeviceRowViewProps) -> Element {
    let row = &props.row;
    let row_class = if row.enabled { "" } else { "row-disabled" };
    let address_class = if row.errors.address {
        "address-chip field-error"
    } else {
        "address-chip"
    };
    let name_class = if row.errors.name || row.errors.calibration {
        "field-error"
    } else {
        ""
    };
    // Only integral addresses can be located
    let locate_address = row.address.as_integer();
    let locate_action = locate_address
        .map(|address| format!("/ui/locate/{}", address))
        .unwrap_or_default();
    let edit_action = format!("/ui/session/edit/{}", row.index);

    rsx! {
        tr { class: "{row_class}",
            td {
                span { class: "{address_class}", "{row.address}" }
            }
            td { class: "{name_class}", "{row.name}" }
            td { "data-volts-text": "true", "{row.voltage}" }
            td { "data-power": "true",
                span { "data-power-text": "true", "{row.power}" }
                if row.reversed {
                    span { class: "power-icon active", title: "Reversed", " \u{21BA}" }
                }
            }
            td {
                div { class: "row-actions",
                    form { method: "post", action: "{locate_action}",
                        button {
                            r#type: "submit",
                            class: "outline",
                            aria_label: "Locate device",
                            disabled: row.locating || props.locked || locate_address.is_none(),
                            "Locate"
                        }
                    }
                    form { method: "post", action: "{edit_action}",
                        button {
                            r#type: "submit",
                            class: "outline secondary",
                            aria_label: "Edit device",
                            disabled: props.locked,
                            "Edit"
                        }
                    }
                }
            }
        }
    }
}
