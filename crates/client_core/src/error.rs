use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The proxy could not be reached or answered with a non-OK status.
    #[error("network error: {0}")]
    Network(String),
    /// The proxy answered, but not in the expected shape.
    #[error("unexpected response: {0}")]
    Validation(String),
    /// The request was refused on its merits.
    #[error("{0}")]
    Domain(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Validation(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}
