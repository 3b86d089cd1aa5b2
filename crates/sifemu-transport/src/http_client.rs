//! [`HttpExchange`] over a real network connection, via `reqwest`.
//!
//! The client sends headers in the order given. Their casing is not kept:
//! `reqwest` normalizes every name, and `http1_title_case_headers` writes
//! them back out in Title-Case. The webview's `authorize` and `user-id`
//! therefore go out as `Authorize` and `User-Id`, and `API-Model` as
//! `Api-Model`. An [`HttpExchange`] that needs the exact casing of the
//! [`HeaderSet`] on the wire has to write HTTP/1 itself.
//!
//! It never decompresses or retries: the raw status, headers, and body go
//! back to the caller for [`ResponseInspector`] and [`RetryPolicy`] to
//! deal with.
//!
//! [`ResponseInspector`]: crate::ResponseInspector
//! [`RetryPolicy`]: crate::RetryPolicy

use sifemu_protocol::HeaderSet;

use crate::{HttpExchange, HttpRequest, HttpResponse, Method, TransportError};

/// An [`HttpExchange`] bound to one server base URL.
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestExchange {
    /// Creates an exchange against `base_url`, e.g.
    /// `http://prod-jp.lovelive.ge.klabgames.net`.
    ///
    /// # Errors
    /// [`TransportError::InvalidRequest`] if the HTTP client can't be
    /// initialized (for example, no TLS backend).
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .http1_title_case_headers()
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wraps an already configured `reqwest` client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl HttpExchange for ReqwestExchange {
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            path,
            headers,
            body,
            timeout,
        } = request;
        let url = format!("{}{path}", self.base_url);

        let mut builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        }
        .timeout(timeout);

        for (name, value) in headers.iter() {
            // reqwest computes the length from the body it is given.
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            builder = builder.header(name, value);
        }
        if method == Method::Post {
            builder = builder.body(body);
        }

        tracing::trace!(%method, %url, "sending request");
        let response = builder.send().await.map_err(map_error)?;

        let status = response.status().as_u16();
        let headers: HeaderSet = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_error)?.to_vec();

        tracing::trace!(%method, %url, status, bytes = body.len(), "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Connection(error.to_string())
    }
}
