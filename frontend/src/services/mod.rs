//! Backend and browser services.
//!
//! This module provides services for external communication:
//!
//! # Services
//!
//! - [`extraction`] - HTTP client for the extraction backend
//! - [`preferences`] - persisted color mode with change notification
//! - [`browser`] - object URLs, file save and theme attribute

pub mod browser;
pub mod extraction;
pub mod preferences;

pub use browser::*;
pub use extraction::*;
pub use preferences::*;

use crate::workflow::UploadController;

/// Controller wired to the real backend and browser APIs.
pub type BrowserController =
    UploadController<HttpExtractionClient, ObjectUrlPreviews, AnchorDownloadSaver>;

/// Preference store backed by `localStorage`.
pub type BrowserPreferences = PreferenceStore<LocalStorageBackend>;
