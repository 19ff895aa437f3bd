//! Waybill Extractor - Frontend Rust/Leptos Application
//!
//! A WebAssembly frontend for uploading waybill images, choosing an
//! extraction model and downloading the extracted data as a spreadsheet.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        App                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Header (title, theme toggle)                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MainContent                                                 │
//! │  ├── Hero (title, description)                              │
//! │  └── UploadSection                                          │
//! │      ├── model select + drop zone                           │
//! │      ├── FileList                                           │
//! │      └── notices + process/download buttons                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Footer                                                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`types`] - Common types (ExtractionModel, WorkflowStatus, etc.)
//! - [`workflow`] - Upload workflow controller (no DOM access)
//! - [`services`] - Backend client, preference store, browser glue
//! - [`components`] - UI components (Header, UploadSection, etc.)

use leptos::*;
use leptos_meta::*;
use leptos_router::*;

// =============================================================================
// Module declarations
// =============================================================================

pub mod config;
pub mod types;
pub mod workflow;
pub mod services;
pub mod components;

// =============================================================================
// Re-exports
// =============================================================================

// Configuration
pub use config::*;

// Types
pub use types::{
    // API
    ExtractionModel, ModelId, RecordId, UploadBatchResult,
    // Workflow
    WorkflowStatus,
    // Preferences
    ColorMode,
    // Errors
    AppError, AppResult,
};

// Components
pub use components::*;

// Services
pub use services::{
    BrowserController, BrowserPreferences, ExtractionApi, HttpExtractionClient,
    LocalStorageBackend, PreferenceBackend, PreferenceStore,
};

// =============================================================================
// Application Entry Point
// =============================================================================

/// Install the panic hook and logger, then mount the app.
pub fn run() {
    // Setup panic hook for better error messages
    console_error_panic_hook::set_once();

    // Setup console logging
    _ = console_log::init_with_level(log::Level::Debug);

    log::info!("🦀 Waybill Extractor - Starting Leptos App");
    log::info!("Using API base URL: {}", api_base_url());

    mount_to_body(|| view! { <App/> });
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text=APP_NAME/>
        <Router>
            <main>
                <Routes>
                    <Route path="/" view=MainContent/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn MainContent() -> impl IntoView {
    // Color mode: the store notifies, the signal re-renders the shell
    let preferences = BrowserPreferences::new(LocalStorageBackend);
    let (mode, set_mode) = create_signal(preferences.get());
    services::apply_color_mode(preferences.get());
    preferences.subscribe(move |next| {
        services::apply_color_mode(next);
        set_mode.set(next);
    });

    let controller = BrowserController::new(
        HttpExtractionClient::new(api_base_url()),
        services::ObjectUrlPreviews,
        services::AnchorDownloadSaver,
    );

    view! {
        <Header mode=mode preferences=preferences/>

        <div class="container">
            <Hero/>
            <UploadSection controller=controller/>
        </div>

        <Footer/>
    }
}
