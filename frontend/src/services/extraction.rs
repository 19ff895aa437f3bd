//! HTTP client for the waybill extraction backend.
//!
//! Three operations against a configured base endpoint:
//!
//! - `GET  {base}/extraction-models/` - list models
//! - `POST {base}/waybills/bulk_upload/` - submit a batch (multipart)
//! - `GET  {base}/waybills/download_excel/?ids=..` - fetch the spreadsheet

use futures::future::{self, Either};
use gloo_net::http::{Request, Response};
use gloo_timers::future::TimeoutFuture;
use web_sys::FormData;

use crate::config::MODELS_TIMEOUT_MS;
use crate::workflow::UploadFile;
use crate::{AppError, AppResult, ExtractionModel, ModelId, RecordId, UploadBatchResult};

/// Backend operations used by the upload workflow.
///
/// The browser implementation is [`HttpExtractionClient`]; tests drive the
/// workflow with in-memory fakes.
#[allow(async_fn_in_trait)]
pub trait ExtractionApi {
    /// Selected file type.
    type File: UploadFile;
    /// Downloaded result payload.
    type Payload;

    async fn list_models(&self) -> AppResult<Vec<ExtractionModel>>;

    async fn submit_batch(
        &self,
        files: &[Self::File],
        model_id: &ModelId,
    ) -> AppResult<UploadBatchResult>;

    async fn fetch_result(
        &self,
        ids: &[RecordId],
        locator: Option<&str>,
    ) -> AppResult<Self::Payload>;
}

// =============================================================================
// URL composition
// =============================================================================

const MODELS_PATH: &str = "extraction-models/";
const BULK_UPLOAD_PATH: &str = "waybills/bulk_upload/";
const DOWNLOAD_PATH: &str = "waybills/download_excel/";
const ROUTING_PREFIX: &str = "api";

/// Strip trailing slashes from the base endpoint.
pub fn normalize_base(base: &str) -> &str {
    base.trim().trim_end_matches('/')
}

/// Normalize a backend-supplied locator into a path relative to the base.
///
/// Collapses leading and duplicate slashes and strips the `api/` routing
/// prefix the backend sometimes includes.
pub fn normalize_locator(locator: &str) -> String {
    let locator = locator.trim();
    let (path, query) = match locator.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (locator, None),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let segments = match segments.split_first() {
        Some((first, rest)) if *first == ROUTING_PREFIX => rest,
        _ => &segments[..],
    };
    let mut normalized = segments.join("/");
    if path.ends_with('/') && !normalized.is_empty() {
        normalized.push('/');
    }

    match query {
        Some(query) => format!("{normalized}?{query}"),
        None => normalized,
    }
}

/// URL listing the extraction models.
pub fn models_url(base: &str) -> String {
    format!("{}/{MODELS_PATH}", normalize_base(base))
}

/// URL accepting a batch upload.
pub fn bulk_upload_url(base: &str) -> String {
    format!("{}/{BULK_UPLOAD_PATH}", normalize_base(base))
}

/// URL of the result spreadsheet.
///
/// Record ids take precedence and always target the canonical download
/// endpoint. Without ids a locator is resolved against the base. With
/// neither, the unfiltered default resource is requested.
pub fn result_url(base: &str, ids: &[RecordId], locator: Option<&str>) -> String {
    let base = normalize_base(base);

    if !ids.is_empty() {
        let joined = ids.iter().map(RecordId::as_str).collect::<Vec<_>>().join(",");
        return format!("{base}/{DOWNLOAD_PATH}?ids={joined}");
    }

    match locator.map(str::trim).filter(|l| !l.is_empty()) {
        Some(absolute) if absolute.starts_with("http://") || absolute.starts_with("https://") => {
            absolute.to_string()
        }
        Some(relative) => match normalize_locator(relative) {
            path if path.is_empty() => format!("{base}/{DOWNLOAD_PATH}"),
            path => format!("{base}/{path}"),
        },
        None => format!("{base}/{DOWNLOAD_PATH}"),
    }
}

/// Message to show for a non-2xx response.
///
/// Prefers the backend's `error` or `detail` field, then the raw body,
/// then the status text.
pub fn server_message(status_text: &str, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        body.to_string()
    } else if !status_text.is_empty() {
        status_text.to_string()
    } else {
        "Unknown error".to_string()
    }
}

// =============================================================================
// Browser client
// =============================================================================

/// `gloo-net` backed client talking to the extraction backend.
#[derive(Clone, Debug)]
pub struct HttpExtractionClient {
    base_url: String,
}

impl HttpExtractionClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base(base_url).to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Turn a non-2xx response into a [`AppError::Server`].
async fn server_error(response: Response) -> AppError {
    let status = response.status();
    let status_text = response.status_text();
    let body = response.text().await.unwrap_or_default();
    AppError::Server {
        status,
        message: server_message(&status_text, &body),
    }
}

impl ExtractionApi for HttpExtractionClient {
    type File = web_sys::File;
    type Payload = Vec<u8>;

    async fn list_models(&self) -> AppResult<Vec<ExtractionModel>> {
        let url = models_url(&self.base_url);
        log::info!("📋 Fetching extraction models from: {}", url);

        let request = Box::pin(
            Request::get(&url)
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .send(),
        );
        let timeout = Box::pin(TimeoutFuture::new(MODELS_TIMEOUT_MS));

        let response = match future::select(request, timeout).await {
            Either::Left((response, _)) => {
                response.map_err(|e| AppError::Network(e.to_string()))?
            }
            Either::Right(_) => {
                return Err(AppError::Network(format!(
                    "timeout of {}ms exceeded",
                    MODELS_TIMEOUT_MS
                )))
            }
        };

        if !response.ok() {
            return Err(server_error(response).await);
        }

        let models = response
            .json::<Vec<ExtractionModel>>()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse response: {}", e)))?;
        log::info!("✅ {} extraction models available", models.len());
        Ok(models)
    }

    async fn submit_batch(
        &self,
        files: &[web_sys::File],
        model_id: &ModelId,
    ) -> AppResult<UploadBatchResult> {
        if model_id.is_empty() {
            return Err(AppError::Validation(
                "Please select an extraction model".to_string(),
            ));
        }
        if files.is_empty() {
            return Err(AppError::Validation(
                "Please select at least one waybill image".to_string(),
            ));
        }

        let form_data = FormData::new()
            .map_err(|e| AppError::Browser(format!("Failed to create FormData: {:?}", e)))?;
        for file in files {
            form_data
                .append_with_blob_and_filename("images", file, &file.name())
                .map_err(|e| AppError::Browser(format!("Failed to append file: {:?}", e)))?;
        }
        form_data
            .append_with_str("extraction_model", model_id.as_str())
            .map_err(|e| AppError::Browser(format!("Failed to append model: {:?}", e)))?;

        let url = bulk_upload_url(&self.base_url);
        log::info!("📤 Uploading {} files to {} (model {})", files.len(), url, model_id);

        let request = Request::post(&url)
            .body(form_data)
            .map_err(|e| AppError::Browser(format!("Failed to build request: {}", e)))?;
        let response = request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(server_error(response).await);
        }

        response
            .json::<UploadBatchResult>()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse response: {}", e)))
    }

    async fn fetch_result(&self, ids: &[RecordId], locator: Option<&str>) -> AppResult<Vec<u8>> {
        let url = result_url(&self.base_url, ids, locator);
        log::info!("📥 Download URL: {}", url);

        let response = Request::get(&url)
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(server_error(response).await);
        }

        response
            .binary()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read spreadsheet: {}", e)))
    }
}
