pub type CmsResult<T> = Result<T, CmsClientError>;

#[derive(Debug, thiserror::Error)]
pub enum CmsClientError {
    /// The request never produced a usable response.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The query endpoint answered 200 but carried structured errors instead of data.
    #[error("query returned errors: {messages}")]
    Query { messages: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CmsClientError {
    /// Whether this error is the backend saying the content does not exist (yet).
    pub fn is_not_found(&self) -> bool {
        matches!(self, CmsClientError::Status { status: 404, .. })
    }
}
