use thiserror::Error;

/// Failures reported by a [`PageFetcher`](crate::fetch::PageFetcher).
///
/// HTTP status codes are not errors at this level, they are returned in the
/// response so the engine can tell 403 and 404 apart from other failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The body could not be decoded with the negotiated content encoding.
    #[error("content decoding failed: {0}")]
    Encoding(String),
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("access denied (403): {0}")]
    Forbidden(String),
    #[error("page not found (404): {0}")]
    NotFound(String),
    #[error("http status {status}: {url}")]
    HttpStatus { status: u16, url: String },
    #[error("url already visited: {0}")]
    Cycle(String),
    #[error("no streams found: {0}")]
    NoStreamsFound(String),
    #[error("playlist error: {0}")]
    Playlist(String),
    #[error("tls error: {0}")]
    Tls(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ResolveError {
    /// Whether this error means "nothing playable was found" as opposed to a
    /// transport failure the caller may want to retry.
    pub fn is_no_streams(&self) -> bool {
        matches!(
            self,
            ResolveError::Forbidden(_)
                | ResolveError::NotFound(_)
                | ResolveError::Cycle(_)
                | ResolveError::NoStreamsFound(_)
        )
    }
}

impl From<reqwest::Error> for ResolveError {
    fn from(e: reqwest::Error) -> Self {
        ResolveError::Fetch(FetchError::Transport(e))
    }
}

impl From<rustls::Error> for ResolveError {
    fn from(e: rustls::Error) -> Self {
        ResolveError::Tls(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_are_no_streams() {
        assert!(ResolveError::Forbidden("http://a/".into()).is_no_streams());
        assert!(ResolveError::NotFound("http://a/".into()).is_no_streams());
        assert!(ResolveError::Cycle("http://a/".into()).is_no_streams());
        assert!(ResolveError::NoStreamsFound("http://a/".into()).is_no_streams());
    }

    #[test]
    fn test_propagated_errors_are_not_no_streams() {
        let e = ResolveError::HttpStatus {
            status: 500,
            url: "http://a/".into(),
        };
        assert!(!e.is_no_streams());
        assert!(!ResolveError::Fetch(FetchError::Encoding("gzip".into())).is_no_streams());
    }
}
