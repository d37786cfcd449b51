use thiserror::Error;

/// Structural failures: the page no longer matches the expected layout.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("state markers `{start}` / `{end}` not found in page script")]
    MarkerNotFound { start: String, end: String },

    #[error("no body script contains `{0}`")]
    ContentMarkerNotFound(String),

    #[error("state blob is not valid JSON: {0}")]
    MalformedBlob(#[from] serde_json::Error),
}

/// A graph key that points at nothing. Callers treat this as a missing facet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dangling reference `{key}`")]
pub struct DanglingReference {
    pub key: String,
}

impl DanglingReference {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed search response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Malformed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),
}

impl FetchError {
    /// Rate limiting and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => *code == 429 || (500..600).contains(code),
            FetchError::Network(_) => true,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);
