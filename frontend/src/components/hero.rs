//! Hero section component

use leptos::*;

use crate::APP_NAME;

#[component]
pub fn Hero() -> impl IntoView {
    view! {
        <div class="hero">
            <h1>{APP_NAME}</h1>
            <p class="subtitle">
                "Upload waybill images, pick an extraction model and download "
                "the extracted data as an Excel spreadsheet."
            </p>
        </div>
    }
}
