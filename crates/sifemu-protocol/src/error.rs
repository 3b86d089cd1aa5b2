//! Error types for the protocol layer.
//!
//! Each crate in sifemu defines its own error enum. A `ProtocolError` means
//! the problem is in building or reading protocol data, never in the
//! network itself.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an envelope to JSON failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing JSON into a protocol type failed.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A descriptor declared a required field the caller didn't supply.
    ///
    /// Raised before anything is sent, so no session counter is consumed.
    #[error("required field `{0}` not supplied")]
    MissingRequiredField(String),

    /// A decoded response lacks `status_code` or `response_data`, or has
    /// the wrong JSON type where an object was expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request path couldn't be derived: no explicit path was given and
    /// the request shape carries no `module`/`action` pair.
    #[error("cannot derive request path: {0}")]
    UnknownTarget(String),
}
