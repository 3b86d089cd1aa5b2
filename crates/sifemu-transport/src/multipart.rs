//! `multipart/form-data` wrapping of the request JSON.
//!
//! The game client's encoder differs from general-purpose HTTP libraries:
//! one part, named `request_data`, no per-part content type, and a boundary
//! of 28 dashes followed by 12 random hex digits.

use rand::Rng;

/// Name of the single form field carrying the JSON body.
pub const REQUEST_FIELD: &str = "request_data";

/// An encoded multipart body and the `Content-Type` that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    /// Wraps `data` with a freshly generated boundary.
    pub fn encode(data: &[u8]) -> Self {
        Self::with_boundary(data, &random_boundary())
    }

    /// Wraps `data` with a caller-chosen boundary.
    pub fn with_boundary(data: &[u8], boundary: &str) -> Self {
        let mut body = Vec::with_capacity(data.len() + 2 * boundary.len() + 64);
        body.extend_from_slice(b"--");
        body.extend_from_slice(boundary.as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{REQUEST_FIELD}\"\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n--");
        body.extend_from_slice(boundary.as_bytes());
        body.extend_from_slice(b"--\r\n");

        Self {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            body,
        }
    }

    pub fn content_length(&self) -> usize {
        self.body.len()
    }
}

/// 28 dashes plus 12 lowercase hex digits (48 random bits).
pub(crate) fn random_boundary() -> String {
    let suffix: u64 = rand::rng().random_range(0..(1u64 << 48));
    format!("{}{suffix:012x}", "-".repeat(28))
}
