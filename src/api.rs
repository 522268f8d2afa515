use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::ApiError;
use crate::model::{Record, SearchPage, UploadedRecord};
use crate::tags::Mode;

/// Default service root, the dev backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
/// Records shown per page.
pub const PAGE_SIZE: usize = 12;
/// Server-side result cap. Paging is windowed client-side over the capped
/// set, so the cap bounds how deep pagination can reach.
const SEARCH_LIMIT: usize = 10_000;
/// Sent in place of an empty query: match everything.
pub const WILDCARD_QUERY: &str = "*";
/// How much raw body a parse failure keeps for diagnostics.
const BODY_SNIPPET_LEN: usize = 200;
/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The two shapes the search endpoint answers with: a bare record array, or
/// an envelope with an explicit total. Resolved to [`SearchPage`] right
/// here at the transport boundary so nothing downstream branches on shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<Record>),
    Enveloped {
        #[serde(default)]
        items: Vec<Record>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl SearchResponse {
    fn normalize(self) -> (Vec<Record>, u64) {
        match self {
            SearchResponse::Bare(items) => {
                let total = items.len() as u64;
                (items, total)
            }
            SearchResponse::Enveloped { items, total } => {
                let total = total.unwrap_or(items.len() as u64);
                (items, total)
            }
        }
    }
}

/// REST client for the catalog service: paged search plus image upload.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl Default for ApiClient {
    fn default() -> Self {
        ApiClient::new(DEFAULT_BASE_URL)
    }
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        ApiClient {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Fetch matching records and window them to one page.
    ///
    /// The service is asked for the full capped result set; the
    /// `[(page-1)*page_size, page*page_size)` window is applied here. An
    /// empty or whitespace-only query goes out as the wildcard sentinel.
    /// If `cancel` fires first the request is abandoned and the outcome is
    /// [`ApiError::Cancelled`], which callers drop rather than report.
    pub async fn search_paged(
        &self,
        query: &str,
        mode: Mode,
        page: usize,
        page_size: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("search for {:?} cancelled in flight", query);
                Err(ApiError::Cancelled)
            }
            result = self.fetch_search(query, mode, page, page_size) => result,
        }
    }

    async fn fetch_search(
        &self,
        query: &str,
        mode: Mode,
        page: usize,
        page_size: usize,
    ) -> Result<SearchPage, ApiError> {
        let trimmed = query.trim();
        let q = if trimmed.is_empty() { WILDCARD_QUERY } else { trimmed };

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", q), ("mode", mode.as_param())])
            .query(&[("limit", SEARCH_LIMIT)])
            .header(ACCEPT, "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let (_, parsed) = read_json::<SearchResponse>(response).await?;
        let (items, total) = parsed.normalize();

        let start = page.saturating_sub(1).saturating_mul(page_size);
        let window: Vec<Record> = items.into_iter().skip(start).take(page_size).collect();
        log::debug!(
            "search q={:?} mode={} page={}: {} rows of {}",
            q,
            mode.as_param(),
            page,
            window.len(),
            total
        );
        Ok(SearchPage { items: window, total })
    }

    /// Upload one compressed image as multipart field `file`. The service
    /// stores it, tags it, and returns the stored record. A non-2xx answer
    /// whose body still parses as JSON surfaces its `message` field (or,
    /// failing that, the whole body) as [`ApiError::Upload`].
    pub async fn upload_image(
        &self,
        bytes: Bytes,
        filename: &str,
    ) -> Result<UploadedRecord, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/images/upload", self.base_url))
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let (status, body) = read_json::<serde_json::Value>(response).await?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            log::warn!("upload of {} rejected: {}", filename, message);
            return Err(ApiError::Upload(message));
        }

        serde_json::from_value(body).map_err(|e| ApiError::Parse {
            status,
            detail: format!("bad upload body ({})", e),
        })
    }
}

/// Seam over the search endpoint so controllers can be driven by fakes.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search_paged(
        &self,
        query: &str,
        mode: Mode,
        page: usize,
        page_size: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage, ApiError>;
}

#[async_trait]
impl SearchBackend for ApiClient {
    async fn search_paged(
        &self,
        query: &str,
        mode: Mode,
        page: usize,
        page_size: usize,
        cancel: &CancelToken,
    ) -> Result<SearchPage, ApiError> {
        ApiClient::search_paged(self, query, mode, page, page_size, cancel).await
    }
}

/// Seam over the upload endpoint, same idea.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn upload_image(&self, bytes: Bytes, filename: &str)
        -> Result<UploadedRecord, ApiError>;
}

#[async_trait]
impl UploadBackend for ApiClient {
    async fn upload_image(
        &self,
        bytes: Bytes,
        filename: &str,
    ) -> Result<UploadedRecord, ApiError> {
        ApiClient::upload_image(self, bytes, filename).await
    }
}

/// Parse a response strictly as JSON. Anything else becomes a
/// [`ApiError::Parse`] carrying the status line and the head of the body,
/// so malformed answers never fail silently.
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<(StatusCode, T), ApiError> {
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let body = response.text().await?;

    if !content_type.contains("application/json") {
        let shown = if content_type.is_empty() { "unknown" } else { &content_type };
        return Err(ApiError::Parse {
            status,
            detail: format!("expected JSON, got {}: {}", shown, snippet(&body)),
        });
    }

    match serde_json::from_str(&body) {
        Ok(parsed) => Ok((status, parsed)),
        Err(e) => Err(ApiError::Parse {
            status,
            detail: format!("bad JSON ({}): {}", e, snippet(&body)),
        }),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_LEN).collect()
}
