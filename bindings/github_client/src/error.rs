pub type GithubResult<T> = Result<T, GithubClientError>;

#[derive(Debug, thiserror::Error)]
pub enum GithubClientError {
    /// The request never produced a usable response: connection refused, timed out, or the
    /// body could not be decoded.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {operation}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GithubClientError {
    /// Whether this error is the backend saying the resource does not exist (yet).
    ///
    /// Poll queries use this to distinguish "not visible" from a real failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GithubClientError::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_only_a_404() {
        let not_found = GithubClientError::Status {
            operation: "get_branch_ref",
            status: 404,
            body: "Not Found".to_string(),
        };
        assert!(not_found.is_not_found());

        let forbidden = GithubClientError::Status {
            operation: "get_branch_ref",
            status: 403,
            body: "rate limited".to_string(),
        };
        assert!(!forbidden.is_not_found());
    }
}
