//! Transport layer for sifemu.
//!
//! Provides the [`HttpExchange`] trait (one physical HTTP request in, one
//! response out) plus everything around it that is independent of session
//! state:
//!
//! - [`MultipartBody`]: the `request_data` multipart wrapping
//! - [`RetryPolicy`]: which failures are retried and how often
//! - [`ResponseInspector`]: maintenance/version/integrity checks,
//!   decompression, and JSON decoding into an [`Exchange`]
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestExchange`], an HTTP client via `reqwest`

#![allow(async_fn_in_trait)]

mod decode;
mod error;
#[cfg(feature = "reqwest")]
mod http_client;
mod inspect;
mod multipart;
mod retry;

pub use decode::{ContentType, decode_json, decompress};
pub use error::TransportError;
#[cfg(feature = "reqwest")]
pub use http_client::ReqwestExchange;
pub use inspect::{Diagnostic, Exchange, ResponseInspector, check_maintenance};
pub use multipart::{MultipartBody, REQUEST_FIELD};
pub use retry::RetryPolicy;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use sifemu_protocol::HeaderSet;

/// The HTTP method of a request. The API path only POSTs; the webview
/// path only GETs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// One fully prepared physical request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Server-relative path, e.g. `/main.php/login/authkey`.
    pub path: String,
    pub headers: HeaderSet,
    /// Encoded body; empty for GETs and bodyless POSTs.
    pub body: Vec<u8>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>, headers: HeaderSet, timeout: Duration) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            headers,
            body: Vec::new(),
            timeout,
        }
    }

    pub fn post(
        path: impl Into<String>,
        headers: HeaderSet,
        body: Vec<u8>,
        timeout: Duration,
    ) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            headers,
            body,
            timeout,
        }
    }
}

/// A raw HTTP response as received, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderSet,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Appends a header (builder style).
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Sets the body (builder style).
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Performs one physical HTTP exchange.
///
/// Implementations must not retry, decompress, or interpret status codes:
/// that is the job of [`RetryPolicy`] and [`ResponseInspector`]. A timed-out
/// attempt must surface as [`TransportError::Timeout`] so it can be retried.
pub trait HttpExchange: Send + Sync + 'static {
    /// Sends `request` and returns whatever the server answered.
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpExchange> HttpExchange for Arc<T> {
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).exchange(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Post.to_string(), "POST");
    }

    #[test]
    fn test_http_response_builder_sets_fields() {
        let response = HttpResponse::new(503)
            .with_header("Content-Type", "text/plain")
            .with_body("busy");

        assert_eq!(response.status, 503);
        assert_eq!(response.headers.get("content-type"), Some("text/plain"));
        assert_eq!(response.body, b"busy");
    }

    #[test]
    fn test_get_request_has_empty_body() {
        let request = HttpRequest::get("/webview.php", HeaderSet::new(), Duration::from_secs(1));
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_empty());
    }
}
