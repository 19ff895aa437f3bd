//! Pending files and their preview handles.
//!
//! A [`PreviewHandle`] is acquired when a file is added and must be handed
//! back to the [`PreviewAllocator`] exactly once. Handles are not `Clone`
//! and `release` takes them by value, so the type system rules out a double
//! release.

use crate::config::ACCEPTED_EXTENSIONS;
use crate::AppResult;

/// A file selected for upload.
///
/// Implemented by `web_sys::File` in the browser and by fakes in tests.
pub trait UploadFile: Clone {
    fn name(&self) -> String;
    fn size_bytes(&self) -> u64;
    fn mime_type(&self) -> String;
}

/// Locally generated reference used to render a thumbnail.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    url: String,
}

impl PreviewHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Allocates and releases preview handles for files.
pub trait PreviewAllocator<F> {
    fn acquire(&self, file: &F) -> AppResult<PreviewHandle>;
    fn release(&self, handle: PreviewHandle);
}

/// Identity of a pending file, unique per controller.
///
/// Two files with the same name get different ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) u64);

/// A file waiting to be submitted.
pub struct PendingFile<F> {
    id: FileId,
    file: F,
    name: String,
    size_bytes: u64,
    mime_type: String,
    preview: Option<PreviewHandle>,
}

impl<F: UploadFile> PendingFile<F> {
    pub(crate) fn new(id: FileId, file: F, preview: Option<PreviewHandle>) -> Self {
        Self {
            id,
            name: file.name(),
            size_bytes: file.size_bytes(),
            mime_type: file.mime_type(),
            file,
            preview,
        }
    }
}

impl<F> PendingFile<F> {
    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    /// Give up the preview handle so it can be released.
    pub(crate) fn take_preview(&mut self) -> Option<PreviewHandle> {
        self.preview.take()
    }

    /// Snapshot for rendering.
    pub fn entry(&self) -> FileEntry {
        FileEntry {
            id: self.id,
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            is_image: self.mime_type.starts_with("image/"),
            preview_url: self.preview.as_ref().map(|h| h.url().to_string()),
        }
    }
}

/// Display data for one pending file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
    pub size_bytes: u64,
    pub is_image: bool,
    pub preview_url: Option<String>,
}

impl FileEntry {
    /// Size label, e.g. `"12.3 KB"`.
    pub fn size_label(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Format a byte count in kilobytes with one decimal.
pub fn format_size(size_bytes: u64) -> String {
    format!("{:.1} KB", size_bytes as f64 / 1024.0)
}

/// Whether the uploader accepts a file.
///
/// Any `image/*` MIME type is accepted, as are the listed extensions
/// (PDFs usually arrive as `application/pdf`).
pub fn is_accepted(name: &str, mime_type: &str) -> bool {
    if mime_type.starts_with("image/") {
        return true;
    }
    name.rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
