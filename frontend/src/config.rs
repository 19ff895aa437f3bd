//! Application configuration.
//!
//! Centralized configuration for the Waybill Extractor frontend.
//! The backend base URL is the only externally supplied value; it is read
//! from the `API_BASE_URL` environment variable at build time.

/// Backend API base URL used when `API_BASE_URL` is not set at build time.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Backend API base URL.
///
/// Resolved at compile time so the WASM bundle carries its endpoint, the
/// same way a bundler injects environment into a static site.
pub fn api_base_url() -> &'static str {
    option_env!("API_BASE_URL")
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
}

/// Application name, shown in the header and the page title.
pub const APP_NAME: &str = "Waybill Extractor";

/// Project repository, linked from the header.
pub const REPOSITORY_URL: &str = "https://github.com/waybill-extractor/waybill-extractor";

/// Local storage key holding the color mode preference.
pub const COLOR_MODE_KEY: &str = "colorMode";

/// Timeout for the extraction model listing (in milliseconds).
pub const MODELS_TIMEOUT_MS: u32 = 10_000;

/// Delay before a saved spreadsheet's object URL is revoked (in milliseconds).
///
/// The browser starts the download asynchronously after the link click.
pub const DOWNLOAD_URL_REVOKE_DELAY_MS: u32 = 1_000;

/// File extensions accepted by the uploader.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "pdf"];

/// Prefix of the downloaded spreadsheet file name.
pub const EXPORT_FILE_PREFIX: &str = "waybills_";

/// MIME type of the downloaded spreadsheet.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
