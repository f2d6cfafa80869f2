use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One page of transaction-shaped records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPage {
    pub records: Vec<Value>,
    /// Absolute URL of the next page; `None` once history is exhausted.
    pub next: Option<String>,
}

impl TransactionPage {
    pub fn end() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Failure to fetch a page. The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("API Key missing")]
    MissingCredentials,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("API Error ({status}){}", detail_suffix(.detail))]
    Status {
        status: u16,
        /// `None` when the error body was empty
        detail: Option<String>,
    },
    #[error("Unexpected API response format: {0}")]
    MalformedBody(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

impl FetchError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MissingCredentials => "credentials",
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::Transport(_) => "transport",
            FetchError::Status { .. } => "status",
            FetchError::MalformedBody(_) => "malformed",
        }
    }
}

/// Cursor-paginated transaction history.
///
/// Implementations must not touch scheduler state; they only hand pages back
/// to the awaiting worker.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    /// Deterministic URL of the first page for `address`.
    fn first_page_url(&self, address: &str, page_size: u32) -> Result<String, FetchError>;

    /// Fetch a single page. Errors are returned, never panicked.
    async fn fetch_page(&self, url: &str) -> Result<TransactionPage, FetchError>;
}
