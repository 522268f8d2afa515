use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::api::{UploadBackend, PAGE_SIZE};
use crate::error::ApiError;
use crate::file_filter::{self, ImageInputError};
use crate::image_processing::{self, CompressError};
use crate::model::{GalleryItem, UploadedRecord};
use crate::search_controller::{SearchController, SearchParams, SearchSnapshot};
use crate::tags::{make_tags, Mode};

/// How long the upload success notice stays up.
const NOTICE_TTL: Duration = Duration::from_millis(1200);
const UPLOAD_NOTICE: &str = "Uploaded!";

/// Any of the three ways the upload pipeline can fail: rejected input,
/// compression failure, or the service saying no.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Input(#[from] ImageInputError),
    #[error(transparent)]
    Compress(#[from] CompressError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A just-uploaded photo held client-side until the session ends. Raw tag
/// text is kept so tags can be recomputed on every mode switch instead of
/// cached across them.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    llm_tags: String,
    alt_text: String,
    pub tags: Vec<String>,
}

impl PendingUpload {
    fn new(record: UploadedRecord, mode: Mode) -> Self {
        let llm_tags = record.llm_tags.unwrap_or_default();
        let alt_text = record.alt_text.unwrap_or_default();
        let tags = make_tags(&llm_tags, &alt_text, mode);
        PendingUpload {
            id: record.id,
            title: record.title,
            image_url: record.image_url,
            llm_tags,
            alt_text,
            tags,
        }
    }

    fn retag(&mut self, mode: Mode) {
        self.tags = make_tags(&self.llm_tags, &self.alt_text, mode);
    }

    fn as_item(&self) -> GalleryItem {
        GalleryItem {
            id: self.id.clone(),
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug)]
struct ViewState {
    query: String,
    mode: Mode,
    page: usize,
    uploads: Vec<PendingUpload>,
    notice: Option<String>,
    upload_error: Option<String>,
    uploading: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            query: String::new(),
            mode: Mode::default(),
            page: 1,
            uploads: Vec::new(),
            notice: None,
            upload_error: None,
            uploading: false,
        }
    }
}

/// Top-level view model: search state plus the optimistic upload overlay.
///
/// Query and mode changes reset to page 1. Fresh uploads are prepended to
/// an in-memory overlay that shadows same-id server rows on the front page
/// of an empty query; the overlay keeps shadowing until it is cleared,
/// even if the server later returns an updated copy.
pub struct Gallery {
    search: Arc<SearchController>,
    uploader: Arc<dyn UploadBackend>,
    state: Arc<RwLock<ViewState>>,
    page_size: usize,
    notice_epoch: Arc<AtomicU64>,
}

impl Gallery {
    pub fn new(search: SearchController, uploader: Arc<dyn UploadBackend>) -> Self {
        Gallery {
            search: Arc::new(search),
            uploader,
            state: Arc::new(RwLock::new(ViewState::default())),
            page_size: PAGE_SIZE,
            notice_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// One client serving both the search and upload roles.
    pub fn with_client(client: crate::api::ApiClient) -> Self {
        let client = Arc::new(client);
        Gallery::new(SearchController::new(client.clone()), client)
    }

    /// Fetch the current page. Call once after construction; parameter
    /// setters re-run it themselves.
    pub async fn refresh(&self) {
        let params = {
            let state = self.state.read().await;
            SearchParams {
                query: state.query.clone(),
                mode: state.mode,
                page: state.page,
                page_size: self.page_size,
            }
        };
        self.search.run(&params).await;
    }

    /// Set the search text and go back to page 1.
    pub async fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        {
            let mut state = self.state.write().await;
            if state.query == query && state.page == 1 {
                return;
            }
            state.query = query;
            state.page = 1;
        }
        self.refresh().await;
    }

    /// Clicking a tag searches for it.
    pub async fn click_tag(&self, tag: &str) {
        self.set_query(tag).await;
    }

    /// Switch the tag source. Pending uploads are re-tagged in place from
    /// their raw fields; the server page is re-fetched because mode is a
    /// query parameter.
    pub async fn set_mode(&self, mode: Mode) {
        {
            let mut state = self.state.write().await;
            if state.mode == mode {
                return;
            }
            state.mode = mode;
            state.page = 1;
            for upload in &mut state.uploads {
                upload.retag(mode);
            }
        }
        self.refresh().await;
    }

    pub async fn set_page(&self, page: usize) {
        let page = page.max(1);
        {
            let mut state = self.state.write().await;
            if state.page == page {
                return;
            }
            state.page = page;
        }
        self.refresh().await;
    }

    /// Pager arrows, clamped to `[1, page_count]`.
    pub async fn next_page(&self) {
        let current = self.state.read().await.page;
        if current < self.page_count().await {
            self.set_page(current + 1).await;
        }
    }

    pub async fn prev_page(&self) {
        let current = self.state.read().await.page;
        if current > 1 {
            self.set_page(current - 1).await;
        }
    }

    pub async fn page_count(&self) -> usize {
        let total = self.search.snapshot().await.total as usize;
        (total.div_ceil(self.page_size)).max(1)
    }

    /// Full upload pipeline: gate, compress, POST, fold into the overlay.
    /// Failures land in `upload_error` for inline display and leave the
    /// gallery list alone.
    pub async fn upload(&self, bytes: Bytes, filename: &str) -> Result<UploadedRecord, UploadError> {
        {
            let mut state = self.state.write().await;
            state.uploading = true;
            state.upload_error = None;
        }
        let result = self.run_upload(bytes, filename).await;
        {
            let mut state = self.state.write().await;
            state.uploading = false;
            if let Err(e) = &result {
                state.upload_error = Some(e.to_string());
            }
        }
        if let Ok(record) = &result {
            self.record_uploaded(record.clone()).await;
        }
        result
    }

    async fn run_upload(&self, bytes: Bytes, filename: &str) -> Result<UploadedRecord, UploadError> {
        file_filter::ensure_image(filename, &bytes)?;
        let compressed = image_processing::compress_for_upload(&bytes, filename)?;
        let record = self
            .uploader
            .upload_image(compressed.bytes, &compressed.filename)
            .await?;
        log::info!("uploaded {} as {}", filename, record.id);
        Ok(record)
    }

    /// Fold a stored record into the overlay: newest first, one entry per
    /// id, back on page 1, transient notice posted.
    pub async fn record_uploaded(&self, record: UploadedRecord) {
        let page_changed = {
            let mut state = self.state.write().await;
            let entry = PendingUpload::new(record, state.mode);
            state.uploads.retain(|u| u.id != entry.id);
            state.uploads.insert(0, entry);
            let changed = state.page != 1;
            state.page = 1;
            state.notice = Some(UPLOAD_NOTICE.to_string());
            changed
        };
        self.post_notice_clear();
        if page_changed {
            self.refresh().await;
        }
    }

    /// Drop the optimistic overlay, letting server copies show through.
    pub async fn clear_uploads(&self) {
        self.state.write().await.uploads.clear();
    }

    /// The list a view renders: pending uploads over the server page on the
    /// front page of an empty query, otherwise the server page alone. One
    /// row per id, first occurrence wins, so the overlay shadows the
    /// server's copy.
    pub async fn rows(&self) -> Vec<GalleryItem> {
        let snapshot = self.search.snapshot().await;
        let state = self.state.read().await;
        let show_uploads = state.page == 1 && state.query.trim().is_empty();
        if !show_uploads {
            return snapshot.items;
        }
        let mut rows: Vec<GalleryItem> =
            Vec::with_capacity(state.uploads.len() + snapshot.items.len());
        rows.extend(state.uploads.iter().map(PendingUpload::as_item));
        rows.extend(snapshot.items);
        dedup_by_id(rows)
    }

    pub async fn snapshot(&self) -> SearchSnapshot {
        self.search.snapshot().await
    }

    pub async fn query(&self) -> String {
        self.state.read().await.query.clone()
    }

    pub async fn mode(&self) -> Mode {
        self.state.read().await.mode
    }

    pub async fn page(&self) -> usize {
        self.state.read().await.page
    }

    pub async fn notice(&self) -> Option<String> {
        self.state.read().await.notice.clone()
    }

    pub async fn upload_error(&self) -> Option<String> {
        self.state.read().await.upload_error.clone()
    }

    pub async fn uploading(&self) -> bool {
        self.state.read().await.uploading
    }

    /// Clear the notice after its TTL unless a newer notice replaced it.
    fn post_notice_clear(&self) {
        let epoch = self.notice_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::clone(&self.state);
        let notice_epoch = Arc::clone(&self.notice_epoch);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_TTL).await;
            if notice_epoch.load(Ordering::SeqCst) == epoch {
                state.write().await.notice = None;
            }
        });
    }
}

fn dedup_by_id(rows: Vec<GalleryItem>) -> Vec<GalleryItem> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.id.clone()))
        .collect()
}
