use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unable to build http client: {0}")]
    Client(String),
    #[error("request failed for {url}: {reason}")]
    Request { url: String, reason: String },
    #[error("non-success status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("unable to read body for {url}: {reason}")]
    Body { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(String),
    #[error("telegram api error: {0}")]
    Api(String),
    /// The api refused the request itself; sending it again cannot succeed.
    #[error("telegram api rejected the request ({status}): {reason}")]
    Rejected { status: u16, reason: String },
}

impl NotifyError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}
