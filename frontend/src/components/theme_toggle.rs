use leptos::*;

use crate::{BrowserPreferences, ColorMode};

/// Light/dark switch. The store notifies the shell, which updates `mode`.
#[component]
pub fn ThemeToggle(mode: ReadSignal<ColorMode>, preferences: BrowserPreferences) -> impl IntoView {
    let on_click = move |_| {
        let next = preferences.toggle();
        log::info!("🎨 Switched to {} mode", next);
    };

    view! {
        <button
            class="theme-toggle"
            title=move || match mode.get() {
                ColorMode::Dark => "Switch to light mode",
                ColorMode::Light => "Switch to dark mode",
            }
            on:click=on_click
        >
            {move || match mode.get() {
                ColorMode::Dark => "☀️",
                ColorMode::Light => "🌙",
            }}
        </button>
    }
}
