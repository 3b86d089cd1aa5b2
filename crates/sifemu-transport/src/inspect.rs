//! Response validation: turns a raw [`HttpResponse`] into an [`Exchange`].
//!
//! Checks run in a fixed order:
//!
//! 1. `Maintenance`: `1` is fatal, any other value is noted
//! 2. `server-version` / `version_up`: noted, never fatal
//! 3. `Content-Encoding`: gzip/deflate decoded, anything else noted
//! 4. `X-Message-Code`: recomputed over the decompressed body
//! 5. `Content-Type`: JSON decoded only when declared, from its charset
//! 6. `status_code` / `response_data`: application status noted
//!
//! Non-fatal findings become [`Diagnostic`]s on the exchange and are logged
//! at `warn`. Nothing is silently dropped.

use std::fmt;

use serde_json::Value;
use sifemu_protocol::{ApiResponse, HeaderSet, IntegrityOracle, ProtocolError};

use crate::{HttpResponse, TransportError, decode_json, decompress};

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A non-fatal condition observed while validating a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A `Maintenance` header with a value other than `1`.
    MaintenanceNotice(String),
    /// The server runs a different version than the client claims.
    ServerVersion { server: String, client: String },
    /// The server asked for a client update (`version_up` not `0`).
    VersionUp(String),
    /// A `Content-Encoding` other than gzip/deflate/identity.
    UnexpectedEncoding(String),
    /// The response's `X-Message-Code` doesn't match the oracle.
    IntegrityMismatch { expected: String, received: String },
    /// The body isn't declared as JSON (or has no `Content-Type`).
    UnexpectedContentType(Option<String>),
    /// JSON declared in a charset no known encoding answers to.
    UnsupportedCharset(String),
    /// A decoded `status_code` other than 200.
    ApplicationStatus(i64),
    /// A decoded body lacking `status_code` or `response_data`.
    MalformedResponse(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaintenanceNotice(value) => write!(f, "Maintenance header is {value}"),
            Self::ServerVersion { server, client } => write!(
                f,
                "server-version {server} differs from client version {client}"
            ),
            Self::VersionUp(value) => write!(f, "version_up is {value}"),
            Self::UnexpectedEncoding(value) => write!(f, "unexpected Content-Encoding {value}"),
            Self::IntegrityMismatch { expected, received } => write!(
                f,
                "X-Message-Code mismatch: expected {expected}, received {received}"
            ),
            Self::UnexpectedContentType(Some(value)) => {
                write!(f, "unexpected Content-Type {value}")
            }
            Self::UnexpectedContentType(None) => write!(f, "missing Content-Type"),
            Self::UnsupportedCharset(value) => write!(f, "unsupported charset {value}"),
            Self::ApplicationStatus(code) => write!(f, "response status_code {code}"),
            Self::MalformedResponse(reason) => write!(f, "malformed response: {reason}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// The validated result of one logical HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub status: u16,
    pub headers: HeaderSet,
    /// The body after decompression.
    pub body: Vec<u8>,
    /// The decoded JSON, if the body was declared and parsed as JSON.
    pub decoded: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Exchange {
    /// The `server-version` response header.
    pub fn server_version(&self) -> Option<&str> {
        self.headers.get("server-version")
    }

    /// Reads the decoded body as an [`ApiResponse`].
    ///
    /// # Errors
    /// [`ProtocolError::MalformedResponse`] if there is no decoded body or
    /// it lacks the required keys.
    pub fn api_response(&self) -> Result<ApiResponse, ProtocolError> {
        let value = self.decoded.as_ref().ok_or_else(|| {
            ProtocolError::MalformedResponse("response has no JSON body".into())
        })?;
        ApiResponse::from_value(value)
    }

    /// Reads the decoded body of a batched exchange, one response per
    /// command; see [`ApiResponse::batch_from_value`].
    pub fn batch_responses(&self) -> Result<Vec<ApiResponse>, ProtocolError> {
        let value = self.decoded.as_ref().ok_or_else(|| {
            ProtocolError::MalformedResponse("response has no JSON body".into())
        })?;
        ApiResponse::batch_from_value(value)
    }

    pub fn has_diagnostic(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.diagnostics.iter().any(predicate)
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Fails with [`TransportError::Maintenance`] on `Maintenance: 1`.
///
/// Runs on every attempt, before status classification, so maintenance
/// stops the call regardless of the remaining retry budget.
pub fn check_maintenance(response: &HttpResponse) -> Result<(), TransportError> {
    match response.headers.get("Maintenance").map(str::trim) {
        Some("1") => {
            tracing::warn!(status = response.status, "server under maintenance");
            Err(TransportError::Maintenance)
        }
        _ => Ok(()),
    }
}

/// Validates responses against an oracle and the client's claimed version.
pub struct ResponseInspector<'a, O: ?Sized> {
    oracle: &'a O,
    client_version: &'a str,
}

impl<'a, O: IntegrityOracle + ?Sized> ResponseInspector<'a, O> {
    pub fn new(oracle: &'a O, client_version: &'a str) -> Self {
        Self {
            oracle,
            client_version,
        }
    }

    /// Runs every check and decodes the body.
    ///
    /// # Errors
    /// - [`TransportError::Maintenance`] on `Maintenance: 1`
    /// - [`TransportError::Decompress`] on a corrupt compressed body
    /// - [`TransportError::InvalidCharset`] on text invalid in its charset
    /// - [`TransportError::InvalidBody`] on JSON that doesn't parse
    pub fn inspect(&self, response: HttpResponse) -> Result<Exchange, TransportError> {
        check_maintenance(&response)?;

        let HttpResponse {
            status,
            headers,
            body,
        } = response;
        let mut diagnostics = Vec::new();

        if let Some(value) = headers.get("Maintenance") {
            diagnostics.push(Diagnostic::MaintenanceNotice(value.to_string()));
        }

        if let Some(server) = headers.get("server-version") {
            if server != self.client_version {
                diagnostics.push(Diagnostic::ServerVersion {
                    server: server.to_string(),
                    client: self.client_version.to_string(),
                });
            }
        }
        if let Some(value) = headers.get("version_up") {
            if value.trim() != "0" {
                diagnostics.push(Diagnostic::VersionUp(value.to_string()));
            }
        }

        let (body, encoding) = decompress(headers.get("Content-Encoding"), body)?;
        diagnostics.extend(encoding);

        if let Some(received) = headers.get("X-Message-Code") {
            if !self.oracle.verify(&body, received) {
                diagnostics.push(Diagnostic::IntegrityMismatch {
                    expected: self.oracle.sign(&body),
                    received: received.to_string(),
                });
            }
        }

        let (decoded, content) = decode_json(&body, headers.get("Content-Type"))?;
        diagnostics.extend(content);

        if let Some(value) = &decoded {
            check_api_shape(value, &mut diagnostics);
        }

        for diagnostic in &diagnostics {
            tracing::warn!(%status, %diagnostic, "response diagnostic");
        }

        Ok(Exchange {
            status,
            headers,
            body,
            decoded,
            diagnostics,
        })
    }
}

/// Notes non-200 application statuses and missing keys, for a single
/// response object or each element of a batch array.
fn check_api_shape(value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    match value {
        Value::Array(items) => {
            for item in items {
                check_api_object(item, diagnostics);
            }
        }
        other => check_api_object(other, diagnostics),
    }
}

fn check_api_object(value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    match ApiResponse::from_value(value) {
        Ok(response) => {
            if !response.is_success() {
                diagnostics.push(Diagnostic::ApplicationStatus(response.status_code));
            }
            if response.authorize_token().is_some() {
                tracing::info!("authorization token found in response");
            }
        }
        Err(ProtocolError::MalformedResponse(reason)) => {
            diagnostics.push(Diagnostic::MalformedResponse(reason));
        }
        Err(other) => {
            diagnostics.push(Diagnostic::MalformedResponse(other.to_string()));
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
