//! Unified error type for the sifemu client.

use sifemu_protocol::{ApiResponse, ProtocolError};
use sifemu_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Library calls return this single type; the `#[from]` variants let `?`
/// lift transport and protocol errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A transport-level error (network, status, maintenance, retries).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (building, encoding, or reading a body).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The server answered with an application error that the calling
    /// flow can't continue past. Raised by game flows, never by the core.
    #[error("API error: status_code {status_code}, error_code {error_code:?}")]
    Api {
        status_code: i64,
        error_code: Option<i64>,
    },
}

impl ClientError {
    /// Builds an [`ClientError::Api`] from a non-success response.
    pub fn api(response: &ApiResponse) -> Self {
        Self::Api {
            status_code: response.status_code,
            error_code: response.error_code(),
        }
    }

    /// Returns the application error code, if this is an API error.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::Api { error_code, .. } => *error_code,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::Connection("refused".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Transport(_)));
        assert!(client_err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MissingRequiredField("tos_id".into());
        let client_err: ClientError = err.into();
        assert!(matches!(client_err, ClientError::Protocol(_)));
        assert!(client_err.to_string().contains("tos_id"));
    }

    #[test]
    fn test_api_reads_error_code() {
        let response = ApiResponse {
            status_code: 600,
            response_data: json!({ "error_code": 4402 }),
        };

        let err = ClientError::api(&response);

        assert_eq!(err.error_code(), Some(4402));
        assert!(err.to_string().contains("600"));
    }
}
