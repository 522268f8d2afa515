use serde::{Deserialize, Serialize};

/// Which raw text field is the source of display tags. Doubles as the
/// `mode` query parameter on the search endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Tags written by the tagging model, one phrase per comma.
    #[default]
    Llm,
    /// Tags recovered from generated alt-text, loosely worded.
    Alt,
}

impl Mode {
    pub fn as_param(self) -> &'static str {
        match self {
            Mode::Llm => "llm",
            Mode::Alt => "alt",
        }
    }
}

/// Tokens with no search value of their own.
const STOP_WORDS: [&str; 12] = [
    "a", "an", "and", "the", "of", "on", "in", "to", "as", "with", "for", "by",
];

/// Cap on display tags per record.
pub const MAX_TAGS: usize = 12;

/// Derive display tags from a record's raw text fields.
///
/// ALT mode tokenizes the alt-text on commas and whitespace runs; LLM mode
/// splits on commas only, so multi-word phrases survive as one tag. Tokens
/// are trimmed, lowercased, deduplicated in first-seen order, and capped at
/// [`MAX_TAGS`]. Empty tokens, single characters, and stop-words are
/// dropped.
pub fn make_tags(llm_tags: &str, alt_text: &str, mode: Mode) -> Vec<String> {
    match mode {
        Mode::Alt => split_words(alt_text),
        Mode::Llm => split_through_comma(llm_tags),
    }
}

/// Comma-separated phrase list, as the tagging model emits it.
pub fn split_through_comma(raw: &str) -> Vec<String> {
    clean(raw.split(','))
}

/// Free text: commas and whitespace runs both separate tokens.
pub fn split_words(raw: &str) -> Vec<String> {
    clean(raw.split(|c: char| c == ',' || c.is_whitespace()))
}

fn clean<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    // A Vec scan keeps first-seen order; the cap bounds it at 12 entries.
    let mut tags: Vec<String> = Vec::new();
    for token in tokens {
        let tag = token.trim().to_lowercase();
        if tag.chars().count() <= 1 || STOP_WORDS.contains(&tag.as_str()) {
            continue;
        }
        if tags.iter().any(|t| t == &tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}
