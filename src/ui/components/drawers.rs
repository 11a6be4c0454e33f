//! Device and upload drawers.
//!
//! Both are plain forms posting back to the operator host; the server keeps
//! the drawer state and re-renders the page.

use dioxus::prelude::*;

use crate::console::{DeviceDraft, UploadState};

/// Delete form. Rendered as raw HTML because the confirmation dialog needs an
/// inline onsubmit handler, which Dioxus SSR cannot emit as a string.
const DELETE_FORM: &str = r#"<form method="post" action="/ui/session/delete" onsubmit="this.confirm.value = window.confirm('Delete this device?') ? 'yes' : ''; return this.confirm.value === 'yes';">
    <input type="hidden" name="confirm" value="">
    <button id="form-delete" type="submit" class="secondary outline">Delete</button>
</form>"#;

#[derive(Props, Clone, PartialEq)]
pub struct DeviceDrawerProps {
    pub adding: bool,
    pub draft: DeviceDraft,
}

#[component]
pub fn DeviceDrawer(props: DeviceDrawerProps) -> Element {
    let draft = &props.draft;
    let title = if props.adding {
        "Add device"
    } else {
        "Edit device"
    };
    let name_invalid = if draft.errors.name { "true" } else { "false" };
    let calibration_invalid = if draft.errors.calibration {
        "true"
    } else {
        "false"
    };

    rsx! {
        dialog { id: "drawer", open: true,
            article {
                header {
                    strong { "{title}" }
                }
                form { id: "device-form", method: "post", action: "/ui/session/commit", "novalidate": "true",
                    label {
                        input {
                            id: "form-enabled",
                            r#type: "checkbox",
                            name: "enabled",
                            checked: draft.enabled,
                        }
                        "Enabled"
                    }
                    label {
                        "Address"
                        input { id: "form-address", r#type: "text", readonly: true, value: "{draft.address}" }
                    }
                    label {
                        "Name"
                        input {
                            id: "form-name",
                            r#type: "text",
                            name: "name",
                            value: "{draft.name}",
                            aria_invalid: "{name_invalid}",
                        }
                        if draft.errors.name {
                            small { class: "field-error", "Name is required" }
                        }
                    }
                    label {
                        "Calibration"
                        input {
                            id: "form-calibration",
                            r#type: "number",
                            name: "calibration",
                            min: "0.01",
                            max: "2",
                            step: "0.001",
                            value: "{draft.calibration}",
                            aria_invalid: "{calibration_invalid}",
                        }
                        if draft.errors.calibration {
                            small { class: "field-error", "Enter a positive number" }
                        }
                    }
                    label {
                        input {
                            id: "form-reversed",
                            r#type: "checkbox",
                            name: "reversed",
                            checked: draft.reversed,
                        }
                        "Reversed"
                    }
                    label {
                        input {
                            id: "form-broadcast",
                            r#type: "checkbox",
                            name: "broadcast",
                            checked: draft.broadcast,
                        }
                        "Broadcast address after saving"
                    }
                    div { class: "grid",
                        button { id: "form-save", r#type: "submit", "Save" }
                        button {
                            id: "form-cancel",
                            r#type: "submit",
                            class: "secondary",
                            "formaction": "/ui/session/cancel",
                            "Cancel"
                        }
                    }
                }
                if !props.adding {
                    div { dangerous_inner_html: DELETE_FORM }
                }
            }
        }
    }
}

#[derive(Props, Clone, PartialEq)]
pub struct UploadDrawerProps {
    pub state: UploadState,
}

#[component]
pub fn UploadDrawerView(props: UploadDrawerProps) -> Element {
    let state = props.state;
    let firmware_invalid = if state.firmware_missing { "true" } else { "false" };
    let public_invalid = if state.public_missing { "true" } else { "false" };
    let outcome = state.outcome.map(|o| o.text());

    rsx! {
        dialog { id: "ota-drawer", open: true,
            article {
                header {
                    strong { "Uploads" }
                }
                form {
                    id: "ota-firmware-form",
                    method: "post",
                    action: "/ui/upload/firmware",
                    enctype: "multipart/form-data",
                    label {
                        "Firmware image"
                        input {
                            id: "ota-firmware-file",
                            r#type: "file",
                            name: "firmware",
                            accept: ".bin",
                            aria_invalid: "{firmware_invalid}",
                        }
                        if state.firmware_missing {
                            small { class: "field-error", "Choose a firmware file first" }
                        }
                    }
                    button { r#type: "submit", "Upload firmware" }
                }
                form {
                    id: "ota-public-form",
                    method: "post",
                    action: "/ui/upload/public",
                    enctype: "multipart/form-data",
                    label {
                        "Public file"
                        input {
                            id: "ota-public-file",
                            r#type: "file",
                            name: "file",
                            aria_invalid: "{public_invalid}",
                        }
                        if state.public_missing {
                            small { class: "field-error", "Choose a file first" }
                        }
                    }
                    button { r#type: "submit", "Upload file" }
                }
                if let Some(text) = outcome {
                    p { id: "ota-outcome", "{text}" }
                }
                form { method: "post", action: "/ui/upload/close",
                    button { r#type: "submit", class: "secondary", "Close" }
                }
            }
        }
    }
}
