//! Light/dark theme toggle.

use dioxus::prelude::*;

/// Theme toggle button.
/// Uses a raw onclick attribute for SSR since the toggle function is already
/// on the page and no Dioxus event handling is needed.
#[component]
pub fn ThemeToggle() -> Element {
    rsx! {
        span {
            dangerous_inner_html: r#"<button id="theme-toggle" class="btn-ghost" type="button" aria-label="Toggle theme" onclick="toggleTheme()">&#9680;</button>"#
        }
    }
}

/// Applies the stored theme before first paint. Included in the head.
pub const THEME_SCRIPT: &str = r#"
(function(){
    const stored = localStorage.getItem('theme');
    const prefersDark = window.matchMedia && window.matchMedia('(prefers-color-scheme: dark)').matches;
    document.documentElement.setAttribute('data-theme', stored || (prefersDark ? 'dark' : 'light'));
})();
"#;

/// Toggle handler. Included at the end of the body.
pub const THEME_FUNCTIONS: &str = r#"
function toggleTheme() {
    const current = document.documentElement.getAttribute('data-theme') === 'dark' ? 'dark' : 'light';
    const next = current === 'dark' ? 'light' : 'dark';
    document.documentElement.setAttribute('data-theme', next);
    localStorage.setItem('theme', next);
    const btn = document.getElementById('theme-toggle');
    if (btn) btn.setAttribute('aria-pressed', next === 'dark' ? 'true' : 'false');
}
"#;
