//! Client core of a clothing-catalog image gallery: paged search over
//! tagged product photos, switchable tag sources (LLM-generated vs
//! alt-text-derived), and optimistic uploads with client-side compression.
//!
//! [`Gallery`] is the top-level entry point; everything below it is usable
//! on its own.

pub mod api;
pub mod cancel;
pub mod error;
pub mod file_filter;
pub mod gallery;
pub mod image_processing;
pub mod model;
pub mod search_controller;
pub mod tags;

pub use api::{ApiClient, SearchBackend, UploadBackend, DEFAULT_BASE_URL, PAGE_SIZE};
pub use cancel::{CancelSource, CancelToken};
pub use error::ApiError;
pub use gallery::{Gallery, PendingUpload, UploadError};
pub use model::{GalleryItem, Record, SearchPage, UploadedRecord};
pub use search_controller::{SearchController, SearchParams, SearchSnapshot};
pub use tags::{make_tags, Mode, MAX_TAGS};
