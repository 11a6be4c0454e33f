//! Layout component wrapping the console page with Pico CSS and common elements.

use dioxus::prelude::*;

use super::theme::{THEME_FUNCTIONS, THEME_SCRIPT};

/// CSS styles for the console (extends Pico CSS).
const CUSTOM_STYLES: &str = r#"
:root { --pico-font-size: 15px; }
.topbar { display: flex; justify-content: space-between; align-items: center; }
.topbar-meta { display: flex; gap: 0.75rem; align-items: center; }
.topbar-meta form { margin: 0; }
.status-pill { padding: 0.1rem 0.6rem; border-radius: 1rem; background: var(--pico-ins-color); color: #fff; font-size: 0.8rem; }
.status-pill.offline { background: var(--pico-del-color); }
.save-status.saving { color: var(--pico-muted-color); }
.save-status.ok { color: var(--pico-ins-color); }
.save-status.error { color: var(--pico-del-color); }
.device-count { color: var(--pico-muted-color); font-weight: normal; }
.address-chip { font-family: monospace; padding: 0 0.4rem; border: 1px solid var(--pico-muted-border-color); border-radius: 0.3rem; }
.row-disabled td { opacity: 0.5; }
.field-error { color: var(--pico-del-color); }
.row-actions { display: flex; gap: 0.25rem; }
.row-actions form { margin: 0; }
.row-actions button, .btn-ghost { margin: 0; padding: 0.25rem 0.5rem; }
.empty-state { color: var(--pico-muted-color); }
small { color: var(--pico-muted-color); }
"#;

#[derive(Props, Clone, PartialEq)]
pub struct LayoutProps {
    /// Page title (shown in browser tab)
    pub title: String,
    /// Page content
    pub children: Element,
    /// Optional additional scripts to include
    #[props(default)]
    pub scripts: Option<String>,
}

/// Main layout component.
#[component]
pub fn Layout(props: LayoutProps) -> Element {
    let version = env!("AMC_VERSION");

    rsx! {
        head {
            meta { charset: "utf-8" }
            meta { name: "viewport", content: "width=device-width, initial-scale=1" }
            title { "{props.title} - Aura Mon" }
            link {
                rel: "stylesheet",
                href: "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"
            }
            style { {CUSTOM_STYLES} }
            script { dangerous_inner_html: THEME_SCRIPT }
        }
        body {
            main { class: "container",
                {props.children}
            }
            footer { class: "container",
                small { "Aura Mon console v{version}" }
            }
            script { dangerous_inner_html: THEME_FUNCTIONS }
            if let Some(scripts) = props.scripts {
                script { dangerous_inner_html: "{scripts}" }
            }
        }
    }
}
