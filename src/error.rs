/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status code.
    #[error("http error {status}: {status_text}")]
    Http {
        /// Numeric status code, e.g. `503`.
        status: u16,
        /// Canonical reason phrase for the status, e.g. `Service Unavailable`.
        status_text: String,
    },

    /// The request path did not parse as an absolute URL.
    #[error("invalid url `{path}`: {reason}")]
    Url { path: String, reason: String },

    /// A request body failed to encode, or a successful response body
    /// failed to decode, as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The attempt was torn down by `stop()`, by a superseding `start()`,
    /// or because the poller was dropped.
    #[error("attempt cancelled")]
    Cancelled,
}
