use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::api::{SearchBackend, PAGE_SIZE, WILDCARD_QUERY};
use crate::cancel::{CancelSource, CancelToken};
use crate::model::{GalleryItem, Record};
use crate::tags::Mode;

/// Maps a raw search row into a display row. Injected so tag derivation
/// stays swappable.
pub type RowMapper = Arc<dyn Fn(&Record, Mode) -> GalleryItem + Send + Sync>;

/// Default mapper: derive tags from the mode's raw text field.
pub fn map_row(record: &Record, mode: Mode) -> GalleryItem {
    GalleryItem {
        id: record.id.clone(),
        title: record.title.clone(),
        image_url: record.image_url.clone(),
        tags: record.tags(mode),
    }
}

/// Everything a view needs to render the current search.
#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    pub items: Vec<GalleryItem>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

/// One search request's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub mode: Mode,
    pub page: usize,
    pub page_size: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            query: String::new(),
            mode: Mode::default(),
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

/// Owns the fetch lifecycle for one gallery view.
///
/// Every run supersedes the previous one: the old request's token is
/// cancelled synchronously before the new request goes out, and a
/// generation counter guards the snapshot, so whichever order responses
/// arrive in, only the latest request's resolution lands.
pub struct SearchController {
    backend: Arc<dyn SearchBackend>,
    map_row: RowMapper,
    state: Arc<RwLock<SearchSnapshot>>,
    generation: AtomicU64,
    inflight: Mutex<Option<CancelSource>>,
}

impl SearchController {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        SearchController::with_mapper(backend, Arc::new(map_row))
    }

    pub fn with_mapper(backend: Arc<dyn SearchBackend>, map_row: RowMapper) -> Self {
        SearchController {
            backend,
            map_row,
            state: Arc::new(RwLock::new(SearchSnapshot::default())),
            generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> SearchSnapshot {
        self.state.read().await.clone()
    }

    /// Cancel the in-flight request without starting a new one. The
    /// abandoned run clears its loading flag and leaves data and error
    /// untouched.
    pub fn cancel(&self) {
        if let Some(source) = self.inflight.lock().unwrap().take() {
            source.cancel();
        }
    }

    /// Run a search, superseding any in-flight request.
    pub async fn run(&self, params: &SearchParams) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = {
            let mut inflight = self.inflight.lock().unwrap();
            if let Some(previous) = inflight.take() {
                previous.cancel();
            }
            let (source, token) = CancelSource::new();
            *inflight = Some(source);
            token
        };

        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let trimmed = params.query.trim();
        let query = if trimmed.is_empty() { WILDCARD_QUERY } else { trimmed }.to_string();
        log::debug!(
            "search run gen={} q={:?} mode={} page={}",
            generation,
            query,
            params.mode.as_param(),
            params.page
        );

        let result = self
            .backend
            .search_paged(&query, params.mode, params.page, params.page_size, &token)
            .await;

        let mut state = self.state.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            // A newer run owns the snapshot; this resolution is discarded
            // whole, success or not.
            return;
        }
        match result {
            Ok(page) => {
                state.items = page
                    .items
                    .iter()
                    .map(|record| (self.map_row)(record, params.mode))
                    .collect();
                state.total = page.total;
                state.loading = false;
            }
            Err(e) if e.is_cancelled() => {
                state.loading = false;
            }
            Err(e) => {
                log::warn!("search for {:?} failed: {}", query, e);
                state.loading = false;
                state.error = Some(e.to_string());
            }
        }
    }
}
