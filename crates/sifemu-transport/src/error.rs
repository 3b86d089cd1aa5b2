/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The attempt timed out. The only network failure that is retried.
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or broke mid-exchange.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be built (e.g. an invalid header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered with a non-retryable, non-200 status.
    #[error("HTTP status code {0}")]
    Status(u16),

    /// The server answered with `Maintenance: 1`.
    #[error("server under maintenance")]
    Maintenance,

    /// Every attempt of the retry budget failed transiently.
    #[error("HTTP request failed {attempts} times")]
    RetriesExhausted { attempts: u32 },

    /// A gzip/deflate body could not be decompressed.
    #[error("decompress failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// The body isn't valid text in its declared charset.
    #[error("body is not valid {0}")]
    InvalidCharset(String),

    /// The body declared `application/json` but isn't valid JSON.
    #[error("invalid JSON body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl TransportError {
    /// Returns `true` for failures the retry loop absorbs.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
