//! Top bar: firmware version, liveness pill, theme and upload controls.

use dioxus::prelude::*;

use super::theme::ThemeToggle;

#[derive(Props, Clone, PartialEq)]
pub struct TopBarProps {
    /// Firmware version, `--` when unknown
    pub version: String,
    /// Whether the last status poll succeeded
    pub live: bool,
}

#[component]
pub fn TopBar(props: TopBarProps) -> Element {
    let pill_class = if props.live {
        "status-pill"
    } else {
        "status-pill offline"
    };
    let pill_text = if props.live { "Live" } else { "Offline" };

    rsx! {
        header { class: "topbar",
            strong { "Aura Mon" }
            div { class: "topbar-meta",
                ThemeToggle {}
                small {
                    "Version "
                    span { id: "version", "{props.version}" }
                }
                form { method: "post", action: "/ui/upload/open",
                    button {
                        id: "ota-open",
                        class: "btn-ghost",
                        r#type: "submit",
                        aria_label: "Open OTA upload",
                        "Upload"
                    }
                }
                div { id: "status-pill", class: "{pill_class}", "{pill_text}" }
            }
        }
    }
}
