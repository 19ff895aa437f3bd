//! Navigation bar with the application title and theme toggle.

use leptos::*;

use super::ThemeToggle;
use crate::{BrowserPreferences, ColorMode, APP_NAME, REPOSITORY_URL};

#[component]
pub fn Header(mode: ReadSignal<ColorMode>, preferences: BrowserPreferences) -> impl IntoView {
    view! {
        <header>
            <div class="header-left">
                <span class="logo-icon">"📄"</span>
                <a href="#" class="logo">{APP_NAME}</a>
            </div>
            <div class="header-right">
                <a href=REPOSITORY_URL class="header-link" target="_blank" title="View source on GitHub">
                    "GitHub"
                </a>
                <ThemeToggle mode=mode preferences=preferences/>
            </div>
        </header>
    }
}
