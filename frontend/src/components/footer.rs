//! Footer component

use leptos::*;

use crate::APP_NAME;

#[component]
pub fn Footer() -> impl IntoView {
    let year = chrono::Utc::now().format("%Y").to_string();

    view! {
        <footer>
            <div>"Copyright © " {year} " " {APP_NAME} " • Powered by " <span class="rust-badge">"🦀 Rust + Leptos"</span></div>
            <div class="footer-links">
                <a href="#" class="footer-link">"Privacy"</a>
                <a href="#" class="footer-link">"Terms"</a>
                <a href="#" class="footer-link">"Contact"</a>
            </div>
        </footer>
    }
}
