pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] pulsr_http::Error),

    #[error("failed to serialize request payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid base url: `{0}`")]
    InvalidBaseUrl(String),

    #[error("`tick_interval` must be a positive duration")]
    InvalidTickInterval,

    #[error("`max_in_flight` must be a positive integer")]
    InvalidMaxInFlight,

    #[error("invalid stage name: `{0}`")]
    InvalidStageName(String),
}
