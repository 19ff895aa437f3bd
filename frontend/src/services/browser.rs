//! Browser glue: object URLs for previews, file save, theme attribute.

use gloo_timers::callback::Timeout;
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, File, FileList, HtmlAnchorElement, Url};

use crate::config::{DOWNLOAD_URL_REVOKE_DELAY_MS, XLSX_MIME};
use crate::workflow::{PreviewAllocator, PreviewHandle, ResultSaver, UploadFile};
use crate::{AppError, AppResult, ColorMode};

impl UploadFile for File {
    fn name(&self) -> String {
        File::name(self)
    }

    fn size_bytes(&self) -> u64 {
        self.size() as u64
    }

    fn mime_type(&self) -> String {
        self.type_()
    }
}

/// Collect the files of a `FileList` (file picker or drop).
pub fn files_from_list(list: &FileList) -> Vec<File> {
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

/// Previews backed by `URL.createObjectURL` / `URL.revokeObjectURL`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObjectUrlPreviews;

impl PreviewAllocator<File> for ObjectUrlPreviews {
    fn acquire(&self, file: &File) -> AppResult<PreviewHandle> {
        Url::create_object_url_with_blob(file)
            .map(PreviewHandle::new)
            .map_err(|e| AppError::Browser(format!("Failed to create preview: {:?}", e)))
    }

    fn release(&self, handle: PreviewHandle) {
        if let Err(e) = Url::revoke_object_url(handle.url()) {
            log::warn!("Could not revoke preview {}: {:?}", handle.url(), e);
        }
    }
}

/// Saves a downloaded spreadsheet through a temporary `<a download>` link.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnchorDownloadSaver;

impl ResultSaver<Vec<u8>> for AnchorDownloadSaver {
    fn save(&self, payload: Vec<u8>, filename: &str) -> AppResult<()> {
        let bytes = Uint8Array::from(payload.as_slice());
        let parts = Array::of1(&bytes);
        let options = BlobPropertyBag::new();
        options.set_type(XLSX_MIME);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| AppError::Browser(format!("Failed to create blob: {:?}", e)))?;

        let blob_url = Url::create_object_url_with_blob(&blob)
            .map_err(|e| AppError::Browser(format!("Failed to create download URL: {:?}", e)))?;

        let link = gloo_utils::document()
            .create_element("a")
            .map_err(|e| AppError::Browser(format!("Failed to create link: {:?}", e)))?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|_| AppError::Browser("Created element is not a link".to_string()))?;
        link.set_href(&blob_url);
        link.set_download(filename);

        let body = gloo_utils::body();
        let appended = body.append_child(&link);
        if appended.is_ok() {
            link.click();
            link.remove();
        }
        revoke_later(blob_url);

        appended
            .map(|_| log::info!("💾 Saved {}", filename))
            .map_err(|e| AppError::Browser(format!("Failed to attach link: {:?}", e)))
    }
}

/// Revoke a download URL once the browser has had time to start the save.
fn revoke_later(blob_url: String) {
    Timeout::new(DOWNLOAD_URL_REVOKE_DELAY_MS, move || {
        if let Err(e) = Url::revoke_object_url(&blob_url) {
            log::warn!("Could not revoke download URL {}: {:?}", blob_url, e);
        }
    })
    .forget();
}

/// Reflect the color mode on `<html data-theme="...">`.
pub fn apply_color_mode(mode: ColorMode) {
    if let Some(root) = gloo_utils::document().document_element() {
        if let Err(e) = root.set_attribute("data-theme", mode.as_str()) {
            log::warn!("Could not apply color mode: {:?}", e);
        }
    }
}
