//! Upload workflow controller.
//!
//! Holds the selected files, the model list and choice, and the
//! submit/download lifecycle. One [`WorkflowStatus`] value drives all UI
//! enablement.
//!
//! ```text
//! Idle ──add/remove──▶ Idle
//! Idle ──submit──▶ Submitting ──ok──▶ Succeeded ──download──▶ Downloading ──ok──▶ Idle
//!                       └──err──▶ Failed ──download──▶ Downloading ──err──▶ Failed
//! ```
//!
//! Every submit starts a new logical batch and bumps a sequence number.
//! Responses are applied only if the sequence number they were issued
//! under is still current.
//!
//! All state lives in a `RefCell` and no borrow is held across an `.await`,
//! so the controller can be cloned freely into event handlers on the single
//! browser thread.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::files::{is_accepted, FileEntry, FileId, PendingFile, PreviewAllocator, UploadFile};
use crate::config::EXPORT_FILE_PREFIX;
use crate::services::ExtractionApi;
use crate::{AppError, AppResult, ExtractionModel, ModelId, UploadBatchResult, WorkflowStatus};

/// Hands a downloaded payload to the user as a file.
pub trait ResultSaver<P> {
    fn save(&self, payload: P, filename: &str) -> AppResult<()>;
}

/// How an operation request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The response was applied to the controller state.
    Applied,
    /// Rejected without side effects (busy, or already done).
    Ignored,
    /// The response arrived for a superseded batch and was dropped.
    Stale,
}

/// File name of a downloaded result, e.g.
/// `waybills_2025-03-01T09:30:00.000Z.xlsx`.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!(
        "{}{}.xlsx",
        EXPORT_FILE_PREFIX,
        now.format("%Y-%m-%dT%H:%M:%S%.3fZ")
    )
}

struct WorkflowState<F> {
    status: WorkflowStatus,
    files: Vec<PendingFile<F>>,
    models: Vec<ExtractionModel>,
    selected_model: Option<ModelId>,
    result: Option<UploadBatchResult>,
    batch_seq: u64,
    next_file_id: u64,
    models_requested: bool,
    /// Failure reported while busy, shown once the operation ends.
    deferred_notice: Option<String>,
}

impl<F: Clone> WorkflowState<F> {
    fn new() -> Self {
        Self {
            status: WorkflowStatus::Idle,
            files: Vec::new(),
            models: Vec::new(),
            selected_model: None,
            result: None,
            batch_seq: 0,
            next_file_id: 0,
            models_requested: false,
            deferred_notice: None,
        }
    }

    /// Show a failure now, or after the in-flight operation when busy.
    fn report(&mut self, message: String) {
        if self.status.is_busy() {
            self.deferred_notice = Some(message);
        } else {
            self.status = WorkflowStatus::Failed(message);
        }
    }

    fn settle(&mut self, status: WorkflowStatus) {
        self.status = match self.deferred_notice.take() {
            Some(message) => WorkflowStatus::Failed(message),
            None => status,
        };
    }

    /// Check the submit guard and snapshot what gets sent.
    fn submission(&self) -> AppResult<(Vec<F>, Vec<FileId>, ModelId)> {
        if self.files.is_empty() {
            return Err(AppError::Validation(
                "Please select at least one waybill image".to_string(),
            ));
        }
        let model = self
            .selected_model
            .clone()
            .ok_or_else(|| AppError::Validation("Please select an extraction model".to_string()))?;

        let blobs = self.files.iter().map(|f| f.file().clone()).collect();
        let ids = self.files.iter().map(PendingFile::id).collect();
        Ok((blobs, ids, model))
    }
}

fn release_all<F, P: PreviewAllocator<F>>(previews: &P, files: Vec<PendingFile<F>>) {
    for mut file in files {
        if let Some(handle) = file.take_preview() {
            previews.release(handle);
        }
    }
}

struct Inner<A, P, S>
where
    A: ExtractionApi,
    P: PreviewAllocator<A::File>,
{
    api: A,
    previews: P,
    saver: S,
    state: RefCell<WorkflowState<A::File>>,
    listeners: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl<A, P, S> Drop for Inner<A, P, S>
where
    A: ExtractionApi,
    P: PreviewAllocator<A::File>,
{
    fn drop(&mut self) {
        let files = std::mem::take(&mut self.state.get_mut().files);
        release_all(&self.previews, files);
    }
}

/// Drives the upload/process/download workflow.
///
/// Cloning is cheap; clones share state. Dropping the last clone releases
/// any preview handles still held.
pub struct UploadController<A, P, S>
where
    A: ExtractionApi,
    P: PreviewAllocator<A::File>,
{
    inner: Rc<Inner<A, P, S>>,
}

impl<A, P, S> Clone for UploadController<A, P, S>
where
    A: ExtractionApi,
    P: PreviewAllocator<A::File>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, P, S> UploadController<A, P, S>
where
    A: ExtractionApi,
    P: PreviewAllocator<A::File>,
    S: ResultSaver<A::Payload>,
{
    pub fn new(api: A, previews: P, saver: S) -> Self {
        Self {
            inner: Rc::new(Inner {
                api,
                previews,
                saver,
                state: RefCell::new(WorkflowState::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register a callback run after every state change.
    pub fn subscribe(&self, listener: impl Fn() + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn notify(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener();
        }
    }

    fn state(&self) -> Ref<'_, WorkflowState<A::File>> {
        self.inner.state.borrow()
    }

    // -------------------------------------------------------------------------
    // Derived state
    // -------------------------------------------------------------------------

    pub fn status(&self) -> WorkflowStatus {
        self.state().status.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state().status.is_busy()
    }

    pub fn can_submit(&self) -> bool {
        let state = self.state();
        !state.status.is_busy() && !state.files.is_empty() && state.selected_model.is_some()
    }

    /// Download never needs a result: without one the unfiltered default is
    /// requested.
    pub fn can_download(&self) -> bool {
        !self.is_busy()
    }

    pub fn files(&self) -> Vec<FileEntry> {
        self.state().files.iter().map(PendingFile::entry).collect()
    }

    pub fn file_count(&self) -> usize {
        self.state().files.len()
    }

    pub fn models(&self) -> Vec<ExtractionModel> {
        self.state().models.clone()
    }

    pub fn selected_model(&self) -> Option<ModelId> {
        self.state().selected_model.clone()
    }

    pub fn result(&self) -> Option<UploadBatchResult> {
        self.state().result.clone()
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Append files to the selection, one preview handle each.
    ///
    /// Files of unsupported types are skipped and reported. Returns the ids
    /// of the files that were added.
    pub fn add_files(&self, files: impl IntoIterator<Item = A::File>) -> Vec<FileId> {
        let mut added = Vec::new();
        let mut rejected = Vec::new();
        {
            let mut state = self.inner.state.borrow_mut();
            for file in files {
                let name = file.name();
                if !is_accepted(&name, &file.mime_type()) {
                    rejected.push(name);
                    continue;
                }

                let preview = match self.inner.previews.acquire(&file) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        log::warn!("⚠️  No preview for {}: {}", name, e);
                        None
                    }
                };
                let id = FileId(state.next_file_id);
                state.next_file_id += 1;
                state.files.push(PendingFile::new(id, file, preview));
                added.push(id);
            }

            if !rejected.is_empty() {
                log::warn!("⚠️  Rejected unsupported files: {}", rejected.join(", "));
                if !state.status.is_busy() {
                    state.status = WorkflowStatus::Failed(format!(
                        "Unsupported file type: {}. Accepted formats are JPEG, PNG and PDF.",
                        rejected.join(", ")
                    ));
                }
            } else if !added.is_empty() && state.status.is_notice() {
                state.status = WorkflowStatus::Idle;
            }
        }

        if !added.is_empty() {
            log::info!("📎 Added {} files", added.len());
        }
        self.notify();
        added
    }

    /// Remove one file by identity and release its preview.
    ///
    /// Returns `false` when the id is unknown.
    pub fn remove_file(&self, id: FileId) -> bool {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            state
                .files
                .iter()
                .position(|f| f.id() == id)
                .map(|index| state.files.remove(index))
        };

        match removed {
            Some(file) => {
                release_all(&self.inner.previews, vec![file]);
                self.notify();
                true
            }
            None => false,
        }
    }

    /// Choose the extraction model; `None` or an empty id clears it.
    pub fn select_model(&self, id: Option<ModelId>) {
        self.inner.state.borrow_mut().selected_model = id.filter(|id| !id.is_empty());
        self.notify();
    }

    // -------------------------------------------------------------------------
    // Network operations
    // -------------------------------------------------------------------------

    /// List the extraction models. Runs once; later calls are ignored.
    ///
    /// A failure leaves the list empty and is reported, replacing any earlier
    /// notice, but never blocks file selection.
    pub async fn load_models(&self) -> AppResult<Completion> {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.models_requested {
                return Ok(Completion::Ignored);
            }
            state.models_requested = true;
            if state.status == WorkflowStatus::Idle {
                state.status = WorkflowStatus::Fetching;
            }
        }
        self.notify();

        let outcome = self.inner.api.list_models().await;

        let completion = {
            let mut state = self.inner.state.borrow_mut();
            match outcome {
                Ok(models) => {
                    if state.selected_model.is_none() {
                        state.selected_model = models.first().map(|m| m.id.clone());
                    }
                    state.models = models;
                    if state.status == WorkflowStatus::Fetching {
                        state.status = WorkflowStatus::Idle;
                    }
                    Ok(Completion::Applied)
                }
                Err(err) => {
                    log::error!("❌ Failed to fetch extraction models: {}", err);
                    state.models.clear();
                    state.report(format!(
                        "Failed to fetch extraction models: {}. Please check that the backend server is running.",
                        err
                    ));
                    Err(err)
                }
            }
        };
        self.notify();
        completion
    }

    /// Upload the selected files with the selected model.
    ///
    /// On success the submitted files leave the selection and the result is
    /// kept for download. On failure files and model stay put for a retry.
    pub async fn submit(&self) -> AppResult<Completion> {
        let prepared = {
            let mut state = self.inner.state.borrow_mut();
            if state.status.is_busy() {
                log::debug!("Submit ignored while {:?}", state.status);
                return Ok(Completion::Ignored);
            }
            match state.submission() {
                Ok((files, file_ids, model)) => {
                    state.batch_seq += 1;
                    state.status = WorkflowStatus::Submitting;
                    Ok((state.batch_seq, files, file_ids, model))
                }
                Err(err) => {
                    state.status = WorkflowStatus::Failed(err.to_string());
                    Err(err)
                }
            }
        };
        self.notify();
        let (seq, files, file_ids, model) = prepared?;

        log::info!("📤 Submitting batch {} ({} files)", seq, files.len());
        let outcome = self.inner.api.submit_batch(&files, &model).await;

        let (completion, uploaded) = {
            let mut state = self.inner.state.borrow_mut();
            if state.batch_seq != seq {
                log::debug!("Discarding stale upload response for batch {}", seq);
                return Ok(Completion::Stale);
            }
            match outcome {
                Ok(result) => {
                    log::info!(
                        "✅ Batch {} uploaded, {} records created",
                        seq,
                        result.ids.len()
                    );
                    state.settle(WorkflowStatus::Succeeded);
                    state.result = Some(result);
                    let (uploaded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.files)
                        .into_iter()
                        .partition(|f| file_ids.contains(&f.id()));
                    state.files = kept;
                    (Ok(Completion::Applied), uploaded)
                }
                Err(err) => {
                    log::error!("❌ Upload failed: {}", err);
                    state.settle(WorkflowStatus::Failed(format!("Failed to upload files: {}", err)));
                    (Err(err), Vec::new())
                }
            }
        };
        release_all(&self.inner.previews, uploaded);
        self.notify();
        completion
    }

    /// Fetch the result spreadsheet and save it.
    ///
    /// Without a pending result the unfiltered default spreadsheet is
    /// requested. A failure keeps the result for a retry.
    pub async fn download(&self) -> AppResult<Completion> {
        let (seq, ids, locator) = {
            let mut state = self.inner.state.borrow_mut();
            if state.status.is_busy() {
                log::debug!("Download ignored while {:?}", state.status);
                return Ok(Completion::Ignored);
            }
            state.status = WorkflowStatus::Downloading;
            let (ids, locator) = match &state.result {
                Some(result) => (
                    result.ids.clone(),
                    Some(result.download_url.clone()).filter(|url| !url.is_empty()),
                ),
                None => (Vec::new(), None),
            };
            (state.batch_seq, ids, locator)
        };
        if ids.is_empty() && locator.is_none() {
            log::warn!("⚠️  No pending batch, requesting the unfiltered spreadsheet");
        }
        self.notify();

        let fetched = self.inner.api.fetch_result(&ids, locator.as_deref()).await;

        if self.state().batch_seq != seq {
            log::debug!("Discarding stale download for batch {}", seq);
            return Ok(Completion::Stale);
        }
        let saved = fetched
            .and_then(|payload| self.inner.saver.save(payload, &export_filename(Utc::now())));

        let completion = {
            let mut state = self.inner.state.borrow_mut();
            match saved {
                Ok(()) => {
                    state.settle(WorkflowStatus::Idle);
                    state.result = None;
                    Ok(Completion::Applied)
                }
                Err(err) => {
                    log::error!("❌ Failed to download Excel file: {}", err);
                    state.settle(WorkflowStatus::Failed(format!(
                        "Failed to download Excel file: {}",
                        err
                    )));
                    Err(err)
                }
            }
        };
        self.notify();
        completion
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Close a success or error notice; the result is kept.
    pub fn dismiss(&self) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            let notice = state.status.is_notice();
            if notice {
                state.status = WorkflowStatus::Idle;
            }
            notice
        };
        if changed {
            self.notify();
        }
    }

    /// Abandon the current batch: in-flight responses become stale and the
    /// pending result is discarded. The file selection is kept.
    pub fn start_new_batch(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.batch_seq += 1;
            state.result = None;
            state.settle(WorkflowStatus::Idle);
        }
        self.notify();
    }

    /// Release every outstanding preview handle.
    pub fn teardown(&self) {
        let files = std::mem::take(&mut self.inner.state.borrow_mut().files);
        if !files.is_empty() {
            log::debug!("Releasing {} previews", files.len());
        }
        release_all(&self.inner.previews, files);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PreviewHandle;
    use crate::RecordId;
    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;
    use std::cell::Cell;
    use std::collections::VecDeque;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Clone, Debug)]
    struct FakeFile {
        name: &'static str,
        size: u64,
        mime: &'static str,
    }

    impl UploadFile for FakeFile {
        fn name(&self) -> String {
            self.name.to_string()
        }

        fn size_bytes(&self) -> u64 {
            self.size
        }

        fn mime_type(&self) -> String {
            self.mime.to_string()
        }
    }

    fn image(name: &'static str) -> FakeFile {
        FakeFile { name, size: 2048, mime: "image/png" }
    }

    enum Reply<T> {
        Ready(AppResult<T>),
        Gated(oneshot::Receiver<AppResult<T>>),
    }

    impl<T> Reply<T> {
        async fn resolve(reply: Option<Self>) -> AppResult<T> {
            match reply {
                Some(Reply::Ready(result)) => result,
                Some(Reply::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(AppError::Network("cancelled".into()))),
                None => Err(AppError::Network("no scripted response".into())),
            }
        }
    }

    #[derive(Default)]
    struct FakeApi {
        models: RefCell<VecDeque<Reply<Vec<ExtractionModel>>>>,
        submits: RefCell<VecDeque<Reply<UploadBatchResult>>>,
        fetches: RefCell<VecDeque<Reply<Vec<u8>>>>,
        submit_calls: RefCell<Vec<(Vec<&'static str>, ModelId)>>,
        fetch_calls: RefCell<Vec<(Vec<RecordId>, Option<String>)>>,
    }

    impl ExtractionApi for Rc<FakeApi> {
        type File = FakeFile;
        type Payload = Vec<u8>;

        async fn list_models(&self) -> AppResult<Vec<ExtractionModel>> {
            let reply = self.models.borrow_mut().pop_front();
            Reply::resolve(reply).await
        }

        async fn submit_batch(
            &self,
            files: &[FakeFile],
            model_id: &ModelId,
        ) -> AppResult<UploadBatchResult> {
            self.submit_calls
                .borrow_mut()
                .push((files.iter().map(|f| f.name).collect(), model_id.clone()));
            let reply = self.submits.borrow_mut().pop_front();
            Reply::resolve(reply).await
        }

        async fn fetch_result(
            &self,
            ids: &[RecordId],
            locator: Option<&str>,
        ) -> AppResult<Vec<u8>> {
            self.fetch_calls
                .borrow_mut()
                .push((ids.to_vec(), locator.map(String::from)));
            let reply = self.fetches.borrow_mut().pop_front();
            Reply::resolve(reply).await
        }
    }

    #[derive(Default)]
    struct FakePreviews {
        next: Cell<u32>,
        acquired: RefCell<Vec<String>>,
        released: RefCell<Vec<String>>,
    }

    impl PreviewAllocator<FakeFile> for Rc<FakePreviews> {
        fn acquire(&self, file: &FakeFile) -> AppResult<PreviewHandle> {
            let n = self.next.get();
            self.next.set(n + 1);
            let url = format!("blob:preview/{}/{}", n, file.name);
            self.acquired.borrow_mut().push(url.clone());
            Ok(PreviewHandle::new(url))
        }

        fn release(&self, handle: PreviewHandle) {
            self.released.borrow_mut().push(handle.url().to_string());
        }
    }

    #[derive(Default)]
    struct FakeSaver {
        fail: Cell<bool>,
        saved: RefCell<Vec<(Vec<u8>, String)>>,
    }

    impl ResultSaver<Vec<u8>> for Rc<FakeSaver> {
        fn save(&self, payload: Vec<u8>, filename: &str) -> AppResult<()> {
            if self.fail.get() {
                return Err(AppError::Browser("download blocked".into()));
            }
            self.saved.borrow_mut().push((payload, filename.to_string()));
            Ok(())
        }
    }

    type TestController = UploadController<Rc<FakeApi>, Rc<FakePreviews>, Rc<FakeSaver>>;

    struct Harness {
        api: Rc<FakeApi>,
        previews: Rc<FakePreviews>,
        saver: Rc<FakeSaver>,
        controller: TestController,
    }

    fn harness() -> Harness {
        let api = Rc::new(FakeApi::default());
        let previews = Rc::new(FakePreviews::default());
        let saver = Rc::new(FakeSaver::default());
        let controller =
            UploadController::new(Rc::clone(&api), Rc::clone(&previews), Rc::clone(&saver));
        Harness { api, previews, saver, controller }
    }

    fn model(id: &str, name: &str) -> ExtractionModel {
        ExtractionModel {
            id: ModelId::new(id),
            name: name.to_string(),
            description: None,
            is_active: Some(true),
        }
    }

    fn batch(ids: &[&str], url: &str) -> UploadBatchResult {
        UploadBatchResult {
            ids: ids.iter().map(|id| RecordId::new(*id)).collect(),
            download_url: url.to_string(),
            message: None,
        }
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    // -------------------------------------------------------------------------
    // Selection and preview handles
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_remove_counts_and_releases_once() {
        let h = harness();
        let ids = h.controller.add_files(vec![
            image("a.png"),
            image("b.png"),
            image("a.png"),
            image("c.jpg"),
            image("d.png"),
        ]);
        assert_eq!(ids.len(), 5);
        assert_eq!(h.controller.file_count(), 5);

        assert!(h.controller.remove_file(ids[1]));
        assert!(h.controller.remove_file(ids[2]));
        assert!(!h.controller.remove_file(ids[2]));
        assert_eq!(h.controller.file_count(), 3);

        let acquired = h.previews.acquired.borrow().clone();
        assert_eq!(*h.previews.released.borrow(), vec![acquired[1].clone(), acquired[2].clone()]);

        h.controller.teardown();
        assert_eq!(h.controller.file_count(), 0);
        assert_eq!(sorted(h.previews.released.borrow().clone()), sorted(acquired));
    }

    #[test]
    fn test_duplicate_names_are_distinct_files() {
        let h = harness();
        let ids = h.controller.add_files(vec![image("scan.png"), image("scan.png")]);
        assert_ne!(ids[0], ids[1]);

        h.controller.remove_file(ids[0]);
        let remaining = h.controller.files();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, ids[1]);
        assert_eq!(remaining[0].size_label(), "2.0 KB");
        assert!(remaining[0].preview_url.is_some());
    }

    #[test]
    fn test_dropping_controller_releases_previews() {
        let h = harness();
        h.controller.add_files(vec![image("a.png"), image("b.png")]);
        let copy = h.controller.clone();
        drop(h.controller);
        assert!(h.previews.released.borrow().is_empty());

        drop(copy);
        assert_eq!(h.previews.released.borrow().len(), 2);
    }

    #[test]
    fn test_teardown_then_drop_does_not_double_release() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.teardown();
        drop(h.controller);
        assert_eq!(h.previews.released.borrow().len(), 1);
    }

    #[test]
    fn test_unsupported_files_are_rejected() {
        let h = harness();
        let added = h.controller.add_files(vec![
            image("ok.png"),
            FakeFile { name: "notes.txt", size: 10, mime: "text/plain" },
        ]);
        assert_eq!(added.len(), 1);
        assert_eq!(h.previews.acquired.borrow().len(), 1);
        let status = h.controller.status();
        assert!(status.error().is_some_and(|e| e.contains("notes.txt")));
    }

    #[test]
    fn test_listeners_are_notified() {
        let h = harness();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        h.controller.subscribe(move || counter.set(counter.get() + 1));

        let ids = h.controller.add_files(vec![image("a.png")]);
        h.controller.remove_file(ids[0]);
        h.controller.select_model(Some(ModelId::new("1")));
        assert_eq!(calls.get(), 3);
    }

    // -------------------------------------------------------------------------
    // Model listing
    // -------------------------------------------------------------------------

    #[test]
    fn test_load_models_selects_first() {
        let h = harness();
        h.api
            .models
            .borrow_mut()
            .push_back(Reply::Ready(Ok(vec![model("1", "AWS Textract"), model("2", "Mistral")])));

        assert_eq!(block_on(h.controller.load_models()), Ok(Completion::Applied));
        assert_eq!(h.controller.models().len(), 2);
        assert_eq!(h.controller.selected_model(), Some(ModelId::new("1")));
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);

        assert_eq!(block_on(h.controller.load_models()), Ok(Completion::Ignored));
    }

    #[test]
    fn test_load_models_failure_does_not_block_selection() {
        let h = harness();
        h.api
            .models
            .borrow_mut()
            .push_back(Reply::Ready(Err(AppError::Network("connection refused".into()))));

        let outcome = block_on(h.controller.load_models());
        assert_eq!(outcome, Err(AppError::Network("connection refused".into())));
        assert!(h.controller.models().is_empty());
        assert!(h
            .controller
            .status()
            .error()
            .is_some_and(|e| e.contains("backend server is running")));

        h.controller.add_files(vec![image("a.png")]);
        assert_eq!(h.controller.file_count(), 1);
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
    }

    #[test]
    fn test_model_list_failure_replaces_earlier_notice() {
        let h = harness();
        let (tx, rx) = oneshot::channel();
        h.api.models.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = controller.load_models().await;
            })
            .unwrap();
        pool.run_until_stalled();

        h.controller.add_files(vec![image("a.png")]);
        assert!(block_on(h.controller.submit()).is_err());
        assert_eq!(
            h.controller.status(),
            WorkflowStatus::Failed("Please select an extraction model".into())
        );

        tx.send(Err(AppError::Network("timeout of 10000ms exceeded".into())))
            .unwrap();
        pool.run_until_stalled();
        assert!(h
            .controller
            .status()
            .error()
            .is_some_and(|e| e.contains("backend server is running")));
    }

    #[test]
    fn test_model_list_failure_during_submit_shown_afterwards() {
        let h = harness();
        let (models_tx, models_rx) = oneshot::channel();
        h.api.models.borrow_mut().push_back(Reply::Gated(models_rx));
        let (submit_tx, submit_rx) = oneshot::channel();
        h.api.submits.borrow_mut().push_back(Reply::Gated(submit_rx));

        let mut pool = LocalPool::new();
        let listing = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = listing.load_models().await;
            })
            .unwrap();
        pool.run_until_stalled();

        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        let submitting = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = submitting.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Submitting);

        models_tx
            .send(Err(AppError::Network("connection refused".into())))
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Submitting);

        submit_tx.send(Ok(batch(&["1"], ""))).unwrap();
        pool.run_until_stalled();
        assert!(h
            .controller
            .status()
            .error()
            .is_some_and(|e| e.contains("backend server is running")));
        assert!(h.controller.result().is_some());
        assert_eq!(h.controller.file_count(), 0);

        h.controller.dismiss();
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
    }

    #[test]
    fn test_status_is_fetching_while_listing() {
        let h = harness();
        let (tx, rx) = oneshot::channel();
        h.api.models.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = controller.load_models().await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Fetching);

        h.controller.add_files(vec![image("a.png")]);
        assert_eq!(h.controller.file_count(), 1);

        tx.send(Ok(vec![model("7", "Mistral")])).unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
        assert!(h.controller.can_submit());
    }

    // -------------------------------------------------------------------------
    // Submit
    // -------------------------------------------------------------------------

    #[test]
    fn test_submit_without_files_makes_no_call() {
        let h = harness();
        h.controller.select_model(Some(ModelId::new("1")));

        let outcome = block_on(h.controller.submit());
        assert!(matches!(outcome, Err(AppError::Validation(_))));
        assert!(h.api.submit_calls.borrow().is_empty());
        assert!(h.controller.status().error().is_some());
    }

    #[test]
    fn test_submit_without_model_makes_no_call() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("  ")));
        assert!(!h.controller.can_submit());

        let outcome = block_on(h.controller.submit());
        assert_eq!(
            outcome,
            Err(AppError::Validation("Please select an extraction model".into()))
        );
        assert!(h.api.submit_calls.borrow().is_empty());
        assert_eq!(
            h.controller.status(),
            WorkflowStatus::Failed("Please select an extraction model".into())
        );
        assert_eq!(h.controller.file_count(), 1);
    }

    #[test]
    fn test_successful_submit_clears_files_keeps_model() {
        let h = harness();
        h.controller.add_files(vec![image("a.png"), image("b.png")]);
        h.controller.select_model(Some(ModelId::new("2")));
        h.api
            .submits
            .borrow_mut()
            .push_back(Reply::Ready(Ok(batch(&["1", "2"], "waybills/download_excel/?ids=1,2"))));

        assert_eq!(block_on(h.controller.submit()), Ok(Completion::Applied));
        assert_eq!(
            *h.api.submit_calls.borrow(),
            vec![(vec!["a.png", "b.png"], ModelId::new("2"))]
        );
        assert_eq!(h.controller.status(), WorkflowStatus::Succeeded);
        assert_eq!(h.controller.file_count(), 0);
        assert_eq!(h.controller.selected_model(), Some(ModelId::new("2")));
        assert_eq!(h.controller.result().map(|r| r.ids.len()), Some(2));
        assert_eq!(h.previews.released.borrow().len(), 2);
    }

    #[test]
    fn test_failed_submit_preserves_selection() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        h.api.submits.borrow_mut().push_back(Reply::Ready(Err(AppError::Server {
            status: 503,
            message: "Mistral API key is not configured.".into(),
        })));

        let outcome = block_on(h.controller.submit());
        assert!(matches!(outcome, Err(AppError::Server { status: 503, .. })));
        assert_eq!(h.controller.file_count(), 1);
        assert_eq!(h.controller.selected_model(), Some(ModelId::new("1")));
        assert!(h.controller.result().is_none());
        assert!(h.previews.released.borrow().is_empty());
        assert_eq!(
            h.controller.status(),
            WorkflowStatus::Failed(
                "Failed to upload files: Server error (503): Mistral API key is not configured."
                    .into()
            )
        );
        assert!(h.controller.can_submit());
    }

    #[test]
    fn test_second_submit_while_submitting_is_ignored() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        let (tx, rx) = oneshot::channel();
        h.api.submits.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = controller.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert!(h.controller.is_busy());
        assert!(!h.controller.can_submit());
        assert!(!h.controller.can_download());

        assert_eq!(block_on(h.controller.submit()), Ok(Completion::Ignored));
        assert_eq!(block_on(h.controller.download()), Ok(Completion::Ignored));
        assert_eq!(h.api.submit_calls.borrow().len(), 1);
        assert!(h.api.fetch_calls.borrow().is_empty());

        tx.send(Ok(batch(&["9"], ""))).unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Succeeded);
    }

    #[test]
    fn test_files_added_during_submit_survive() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        let (tx, rx) = oneshot::channel();
        h.api.submits.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = controller.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();

        h.controller.add_files(vec![image("late.png")]);
        tx.send(Ok(batch(&["1"], ""))).unwrap();
        pool.run_until_stalled();

        let remaining = h.controller.files();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "late.png");
        assert_eq!(h.previews.released.borrow().len(), 1);
    }

    #[test]
    fn test_stale_submit_response_is_discarded() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        let (tx, rx) = oneshot::channel();
        h.api.submits.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let first = h.controller.clone();
        let first_outcome = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&first_outcome);
        pool.spawner()
            .spawn_local(async move {
                *slot.borrow_mut() = Some(first.submit().await);
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Submitting);

        h.controller.start_new_batch();
        h.api
            .submits
            .borrow_mut()
            .push_back(Reply::Ready(Ok(batch(&["4", "5"], ""))));
        assert_eq!(block_on(h.controller.submit()), Ok(Completion::Applied));

        tx.send(Ok(batch(&["1", "2", "3"], ""))).unwrap();
        pool.run_until_stalled();

        assert_eq!(*first_outcome.borrow(), Some(Ok(Completion::Stale)));
        assert_eq!(h.controller.status(), WorkflowStatus::Succeeded);
        assert_eq!(h.controller.result(), Some(batch(&["4", "5"], "")));
    }

    #[test]
    fn test_stale_failure_does_not_overwrite_status() {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        let (tx, rx) = oneshot::channel();
        h.api.submits.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = controller.submit().await;
            })
            .unwrap();
        pool.run_until_stalled();

        h.controller.start_new_batch();
        tx.send(Err(AppError::Network("timeout".into()))).unwrap();
        pool.run_until_stalled();

        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
        assert_eq!(h.controller.file_count(), 1);
    }

    // -------------------------------------------------------------------------
    // Download
    // -------------------------------------------------------------------------

    fn submitted_harness() -> Harness {
        let h = harness();
        h.controller.add_files(vec![image("a.png")]);
        h.controller.select_model(Some(ModelId::new("1")));
        h.api
            .submits
            .borrow_mut()
            .push_back(Reply::Ready(Ok(batch(&["1", "2", "3"], "/api/waybills/download/x"))));
        assert_eq!(block_on(h.controller.submit()), Ok(Completion::Applied));
        h
    }

    #[test]
    fn test_download_uses_batch_and_saves() {
        let h = submitted_harness();
        h.api.fetches.borrow_mut().push_back(Reply::Ready(Ok(vec![0x50, 0x4b])));

        assert_eq!(block_on(h.controller.download()), Ok(Completion::Applied));
        assert_eq!(
            *h.api.fetch_calls.borrow(),
            vec![(
                vec![RecordId::new("1"), RecordId::new("2"), RecordId::new("3")],
                Some("/api/waybills/download/x".to_string())
            )]
        );

        let saved = h.saver.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, vec![0x50, 0x4b]);
        assert!(saved[0].1.starts_with("waybills_"));
        assert!(saved[0].1.ends_with(".xlsx"));

        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
        assert!(h.controller.result().is_none());
    }

    #[test]
    fn test_download_failure_keeps_result() {
        let h = submitted_harness();
        h.api
            .fetches
            .borrow_mut()
            .push_back(Reply::Ready(Err(AppError::Network("offline".into()))));

        assert_eq!(
            block_on(h.controller.download()),
            Err(AppError::Network("offline".into()))
        );
        assert_eq!(
            h.controller.status(),
            WorkflowStatus::Failed("Failed to download Excel file: Network error: offline".into())
        );
        assert!(h.controller.result().is_some());

        h.api.fetches.borrow_mut().push_back(Reply::Ready(Ok(vec![1])));
        assert_eq!(block_on(h.controller.download()), Ok(Completion::Applied));
        assert_eq!(h.api.fetch_calls.borrow()[1].0.len(), 3);
    }

    #[test]
    fn test_save_failure_keeps_result() {
        let h = submitted_harness();
        h.saver.fail.set(true);
        h.api.fetches.borrow_mut().push_back(Reply::Ready(Ok(vec![1, 2])));

        assert!(matches!(block_on(h.controller.download()), Err(AppError::Browser(_))));
        assert!(h.controller.result().is_some());
        assert!(h.controller.status().error().is_some());
    }

    #[test]
    fn test_stale_download_is_discarded() {
        let h = submitted_harness();
        let (tx, rx) = oneshot::channel();
        h.api.fetches.borrow_mut().push_back(Reply::Gated(rx));

        let mut pool = LocalPool::new();
        let controller = h.controller.clone();
        let outcome = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&outcome);
        pool.spawner()
            .spawn_local(async move {
                *slot.borrow_mut() = Some(controller.download().await);
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(h.controller.status(), WorkflowStatus::Downloading);

        h.controller.start_new_batch();
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);

        tx.send(Ok(vec![0x50, 0x4b])).unwrap();
        pool.run_until_stalled();

        assert_eq!(*outcome.borrow(), Some(Ok(Completion::Stale)));
        assert!(h.saver.saved.borrow().is_empty());
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
        assert!(h.controller.result().is_none());
        assert_eq!(h.api.fetch_calls.borrow().len(), 1);
    }

    #[test]
    fn test_download_without_batch_requests_default() {
        let h = harness();
        h.api.fetches.borrow_mut().push_back(Reply::Ready(Ok(vec![9])));

        assert!(h.controller.can_download());
        assert_eq!(block_on(h.controller.download()), Ok(Completion::Applied));
        assert_eq!(*h.api.fetch_calls.borrow(), vec![(Vec::new(), None)]);
    }

    #[test]
    fn test_dismiss_keeps_result() {
        let h = submitted_harness();
        h.controller.dismiss();
        assert_eq!(h.controller.status(), WorkflowStatus::Idle);
        assert!(h.controller.result().is_some());
    }

    #[test]
    fn test_export_filename_format() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T09:30:05.123Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(export_filename(now), "waybills_2025-03-01T09:30:05.123Z.xlsx");
    }
}
