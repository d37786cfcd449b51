use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::error::ExtractError;

static BODY_SCRIPT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body script").unwrap());

/// Characters between the start marker and the JSON text (` =`).
const ASSIGNMENT_LEN: usize = 2;

/// Where the serialized client state lives inside a store page.
#[derive(Debug, Clone)]
pub struct Markers {
    /// Substring that identifies the script holding the normalized cache.
    pub sentinel: String,
    pub start: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            sentinel: "ROOT_QUERY".to_string(),
            start: "window.__APOLLO_STATE__".to_string(),
            end: "window.__PLACE_STATE__".to_string(),
        }
    }
}

/// Locate the state script in `html` and cut the JSON blob out of it.
pub fn extract_state_blob(html: &str, markers: &Markers) -> Result<String, ExtractError> {
    let script = find_state_script(html, &markers.sentinel)?;
    slice_state(&script, &markers.start, &markers.end).map(str::to_string)
}

/// First `<body>` script (document order) whose text contains `sentinel`.
pub fn find_state_script(html: &str, sentinel: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    document
        .select(&BODY_SCRIPT)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains(sentinel))
        .ok_or_else(|| ExtractError::ContentMarkerNotFound(sentinel.to_string()))
}

/// Text between `start` and the next `end`, minus the assignment prefix and the
/// trailing statement terminator.
pub fn slice_state<'a>(script: &'a str, start: &str, end: &str) -> Result<&'a str, ExtractError> {
    let not_found = || ExtractError::MarkerNotFound {
        start: start.to_string(),
        end: end.to_string(),
    };
    if !script.contains(end) {
        return Err(not_found());
    }

    let after_start = script.find(start).ok_or_else(not_found)? + start.len();
    let rest = &script[after_start..];
    let end_idx = rest.find(end).ok_or_else(not_found)?;
    let assignment = rest
        .char_indices()
        .nth(ASSIGNMENT_LEN)
        .map(|(i, _)| i)
        .unwrap_or(rest.len())
        .min(end_idx);

    let trimmed = rest[assignment..end_idx].trim();
    let without_terminator = trimmed
        .char_indices()
        .last()
        .map(|(i, _)| &trimmed[..i])
        .unwrap_or(trimmed);
    Ok(without_terminator)
}
