use serde::{Deserialize, Serialize};

use crate::tags::{make_tags, Mode};

/// One catalog photo as `GET /search` returns it. Immutable once fetched;
/// tags are always derived fresh from the raw text blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "postID")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "llmTags", default)]
    pub llm_tags: Option<String>,
    #[serde(rename = "altText", default)]
    pub alt_text: Option<String>,
    /// Upload date as the service formats it; carried through untouched.
    #[serde(default)]
    pub date: Option<String>,
}

impl Record {
    /// Display tags for this record under `mode`. Missing raw fields read
    /// as empty text.
    pub fn tags(&self, mode: Mode) -> Vec<String> {
        make_tags(
            self.llm_tags.as_deref().unwrap_or(""),
            self.alt_text.as_deref().unwrap_or(""),
            mode,
        )
    }
}

/// A `/search` response normalized to one shape and windowed to a page.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<Record>,
    /// Server-side match count, used only for page arithmetic.
    pub total: u64,
}

/// Metadata of a freshly stored photo, as `POST /images/upload` returns it.
/// Held client-side for the session; note the id key differs from the
/// search shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "llmTags", default)]
    pub llm_tags: Option<String>,
    #[serde(rename = "altText", default)]
    pub alt_text: Option<String>,
}

/// A display row, ready for rendering: a mapped search hit or a pending
/// upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GalleryItem {
    pub id: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
}
