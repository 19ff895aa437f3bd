//! Common types used across the frontend application.
//!
//! This module centralizes type definitions to avoid duplication
//! and ensure consistency across components.
//!
//! # Categories
//!
//! - **API Types** - Backend request/response structures
//! - **Workflow Types** - Upload lifecycle status
//! - **Preference Types** - Persisted color mode
//! - **Error Types** - Frontend error handling

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier as it appears on the wire.
///
/// The backend sends integer primary keys, but the client treats ids as
/// opaque and accepts strings too.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(i64),
    Text(String),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

/// Opaque extraction model identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireId")]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<WireId> for ModelId {
    fn from(id: WireId) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a processed waybill record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "WireId")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<WireId> for RecordId {
    fn from(id: WireId) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// API Types
// =============================================================================

/// A backend-side extraction configuration.
///
/// Returned by `GET /extraction-models/`. Never created or modified
/// by the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionModel {
    /// Opaque identifier sent back on upload
    pub id: ModelId,
    /// Display name
    pub name: String,
    /// Optional human description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the backend currently offers the model
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Response from `POST /waybills/bulk_upload/`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadBatchResult {
    /// Identifiers of the created waybill records, in upload order
    pub ids: Vec<RecordId>,
    /// Locator of the result spreadsheet, possibly relative
    #[serde(default)]
    pub download_url: String,
    /// Backend summary ("Successfully uploaded N images")
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Workflow Types
// =============================================================================

/// Status of the upload/process/download lifecycle.
///
/// A single value drives all UI enablement.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum WorkflowStatus {
    #[default]
    Idle,
    /// Listing extraction models
    Fetching,
    /// Batch upload in flight
    Submitting,
    /// Result spreadsheet download in flight
    Downloading,
    /// Last submission succeeded; a result is ready
    Succeeded,
    /// Last operation failed with a displayable message
    Failed(String),
}

impl WorkflowStatus {
    /// True while a submit or download is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowStatus::Submitting | WorkflowStatus::Downloading)
    }

    /// True when the status carries a dismissible notice.
    pub fn is_notice(&self) -> bool {
        matches!(self, WorkflowStatus::Succeeded | WorkflowStatus::Failed(_))
    }

    /// Error message, if the last operation failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            WorkflowStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// CSS class of the notice shown for this status.
    pub fn css_class(&self) -> &'static str {
        match self {
            WorkflowStatus::Idle => "status-idle",
            WorkflowStatus::Fetching => "status-fetching",
            WorkflowStatus::Submitting => "status-submitting",
            WorkflowStatus::Downloading => "status-downloading",
            WorkflowStatus::Succeeded => "status-success",
            WorkflowStatus::Failed(_) => "status-error",
        }
    }
}

// =============================================================================
// Preference Types
// =============================================================================

/// Light or dark color mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Light,
    Dark,
}

impl ColorMode {
    /// Persisted representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Light => "light",
            ColorMode::Dark => "dark",
        }
    }

    /// Parse a persisted value; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "light" => Some(ColorMode::Light),
            "dark" => Some(ColorMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ColorMode::Light => ColorMode::Dark,
            ColorMode::Dark => ColorMode::Light,
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Frontend application errors.
///
/// Unified error type for all frontend operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AppError {
    /// Client-side precondition failure (e.g. no model selected).
    #[error("{0}")]
    Validation(String),

    /// The request never reached the server or got no response.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A browser API (object URLs, file save) failed.
    #[error("Browser error: {0}")]
    Browser(String),
}

/// Result type alias for frontend operations.
pub type AppResult<T> = Result<T, AppError>;
