//! Bookmark text normalization
//!
//! Turns one bookmark record into one plain-text document suitable for
//! embedding, plus a small metadata record that travels with the vector.

use crate::bookmarks::Bookmark;
use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Maximum characters of normalized text passed to the embedder
pub const MAX_TEXT_LEN: usize = 8000;

/// Documents shorter than this carry no indexable content
pub const MIN_TEXT_LEN: usize = 10;

/// Marker appended when text is truncated; does not count toward MAX_TEXT_LEN
const TRUNCATION_MARKER: &str = "...";

/// Metadata stored alongside the embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkMetadata {
    pub title: Option<String>,
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
}

/// A bookmark reduced to embeddable text plus metadata
#[derive(Debug, Clone)]
pub struct IndexableDocument {
    pub id: String,
    pub text: String,
    pub metadata: BookmarkMetadata,
}

impl IndexableDocument {
    /// True when the normalized text is too short to be worth indexing
    pub fn is_empty(&self) -> bool {
        self.text.chars().count() < MIN_TEXT_LEN
    }
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("static pattern"))
}

/// Strip markup tags, replacing each with a space so adjacent words
/// don't fuse together
pub fn strip_markup(html: &str) -> String {
    tag_pattern().replace_all(html, " ").into_owned()
}

/// Convert a bookmark into an indexable document.
///
/// Segment order is fixed so repeated runs produce identical text: title,
/// content title, content description, content body (plain text preferred,
/// markup stripped otherwise), note, summary, a synthetic tags line, and
/// finally the content URL. Segments are joined with blank lines.
pub fn normalize(bookmark: &Bookmark) -> Result<IndexableDocument> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = &bookmark.title {
        parts.push(title.clone());
    }

    if let Some(content) = &bookmark.content {
        if let Some(title) = &content.title {
            parts.push(title.clone());
        }
        if let Some(description) = &content.description {
            parts.push(description.clone());
        }
        if let Some(text) = &content.content {
            parts.push(text.clone());
        } else if let Some(html) = &content.html_content {
            parts.push(strip_markup(html));
        }
    }

    if let Some(note) = &bookmark.note {
        parts.push(note.clone());
    }

    if let Some(summary) = &bookmark.summary {
        parts.push(summary.clone());
    }

    if !bookmark.tags.is_empty() {
        let names: Vec<&str> = bookmark.tags.iter().map(|t| t.name.as_str()).collect();
        parts.push(format!("Tags: {}", names.join(", ")));
    }

    if let Some(url) = bookmark.content.as_ref().and_then(|c| c.url.as_ref()) {
        parts.push(url.clone());
    }

    let mut text = parts.join("\n\n").trim().to_string();

    // Embedding models have input limits
    if text.chars().count() > MAX_TEXT_LEN {
        text = text.chars().take(MAX_TEXT_LEN).collect();
        text.push_str(TRUNCATION_MARKER);
    }

    let metadata = BookmarkMetadata {
        title: bookmark
            .title
            .clone()
            .or_else(|| bookmark.content.as_ref().and_then(|c| c.title.clone())),
        url: bookmark.content.as_ref().and_then(|c| c.url.clone()),
        tags: bookmark.tags.iter().map(|t| t.name.clone()).collect(),
        created_at: bookmark.created_at.clone(),
    };

    Ok(IndexableDocument {
        id: bookmark.id.clone(),
        text,
        metadata,
    })
}
