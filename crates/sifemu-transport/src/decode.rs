//! Body decompression and JSON decoding.

use std::io::Read;

use encoding_rs::{Encoding, UTF_8};
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use serde_json::Value;

use crate::{Diagnostic, TransportError};

/// Decompresses `body` according to its `Content-Encoding`.
///
/// `gzip` and `deflate` are inflated; either header accepts a gzip or a
/// zlib container, detected from the gzip magic bytes, and `deflate` also
/// accepts a raw stream. No encoding or `identity` passes through. Any
/// other encoding passes through unchanged with a diagnostic.
///
/// # Errors
/// [`TransportError::Decompress`] if a declared gzip/deflate body is corrupt.
pub fn decompress(
    encoding: Option<&str>,
    body: Vec<u8>,
) -> Result<(Vec<u8>, Option<Diagnostic>), TransportError> {
    let Some(encoding) = encoding.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok((body, None));
    };

    match encoding.to_ascii_lowercase().as_str() {
        "gzip" | "x-gzip" => Ok((inflate(&body, false)?, None)),
        "deflate" => Ok((inflate(&body, true)?, None)),
        "identity" => Ok((body, None)),
        _ => Ok((body, Some(Diagnostic::UnexpectedEncoding(encoding.to_string())))),
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn inflate(body: &[u8], allow_raw: bool) -> Result<Vec<u8>, TransportError> {
    if body.starts_with(&GZIP_MAGIC) {
        return read_all(MultiGzDecoder::new(body));
    }
    match read_all(ZlibDecoder::new(body)) {
        Err(_) if allow_raw => read_all(DeflateDecoder::new(body)),
        result => result,
    }
}

fn read_all(mut reader: impl Read) -> Result<Vec<u8>, TransportError> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(TransportError::Decompress)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Content-Type
// ---------------------------------------------------------------------------

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Lower-cased media type, e.g. `application/json`.
    pub mime: String,
    /// The `charset` parameter, if declared, without quotes.
    pub charset: Option<String>,
}

impl ContentType {
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let mime = parts
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let charset = parts.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        });
        Self { mime, charset }
    }

    pub fn is_json(&self) -> bool {
        self.mime == "application/json"
    }

    /// The declared charset as an [`Encoding`], UTF-8 when none is
    /// declared. `Err` carries a label no encoding answers to.
    fn encoding(&self) -> Result<&'static Encoding, &str> {
        match self.charset.as_deref() {
            None => Ok(UTF_8),
            Some(label) => Encoding::for_label(label.as_bytes()).ok_or(label),
        }
    }
}

/// Decodes `body` as JSON if `content_type` declares `application/json`,
/// transcoding from the declared charset first.
///
/// Anything else yields `None` plus a diagnostic, never an error: the
/// server occasionally answers with HTML error pages. So does a charset
/// label no known encoding answers to.
///
/// # Errors
/// - [`TransportError::InvalidCharset`] if the body isn't valid in its
///   declared charset
/// - [`TransportError::InvalidBody`] if a JSON-declared body doesn't parse
pub fn decode_json(
    body: &[u8],
    content_type: Option<&str>,
) -> Result<(Option<Value>, Option<Diagnostic>), TransportError> {
    let Some(raw) = content_type else {
        return Ok((None, Some(Diagnostic::UnexpectedContentType(None))));
    };
    let parsed = ContentType::parse(raw);

    if !parsed.is_json() {
        return Ok((
            None,
            Some(Diagnostic::UnexpectedContentType(Some(raw.to_string()))),
        ));
    }
    let encoding = match parsed.encoding() {
        Ok(encoding) => encoding,
        Err(label) => {
            return Ok((None, Some(Diagnostic::UnsupportedCharset(label.to_string()))));
        }
    };

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| TransportError::InvalidCharset(encoding.name().to_string()))?;
    let value = serde_json::from_str(&text).map_err(TransportError::InvalidBody)?;
    Ok((Some(value), None))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use serde_json::json;

    use super::*;

    const PLAIN: &[u8] = br#"{"status_code":200,"response_data":{}}"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_gzip_restores_plaintext() {
        let (body, diagnostic) = decompress(Some("gzip"), gzip(PLAIN)).unwrap();
        assert_eq!(body, PLAIN);
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decompress_deflate_accepts_zlib_stream() {
        let (body, _) = decompress(Some("deflate"), zlib(PLAIN)).unwrap();
        assert_eq!(body, PLAIN);
    }

    #[test]
    fn test_decompress_gzip_header_accepts_zlib_stream() {
        let (body, _) = decompress(Some("gzip"), zlib(PLAIN)).unwrap();
        assert_eq!(body, PLAIN);
    }

    #[test]
    fn test_decompress_deflate_header_accepts_gzip_stream() {
        let (body, _) = decompress(Some("deflate"), gzip(PLAIN)).unwrap();
        assert_eq!(body, PLAIN);
    }

    #[test]
    fn test_decompress_without_encoding_passes_through() {
        let (body, diagnostic) = decompress(None, PLAIN.to_vec()).unwrap();
        assert_eq!(body, PLAIN);
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decompress_unknown_encoding_warns_and_passes_through() {
        let (body, diagnostic) = decompress(Some("br"), PLAIN.to_vec()).unwrap();
        assert_eq!(body, PLAIN);
        assert_eq!(diagnostic, Some(Diagnostic::UnexpectedEncoding("br".into())));
    }

    #[test]
    fn test_decompress_corrupt_gzip_fails() {
        let result = decompress(Some("gzip"), b"not gzip".to_vec());
        assert!(matches!(result, Err(TransportError::Decompress(_))));
    }

    #[test]
    fn test_content_type_parse_reads_charset() {
        let parsed = ContentType::parse("application/json; charset=UTF-8");
        assert!(parsed.is_json());
        assert_eq!(parsed.charset.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_decode_json_with_charset_decodes() {
        let (value, diagnostic) =
            decode_json(PLAIN, Some("application/json; charset=utf-8")).unwrap();
        assert_eq!(value, Some(json!({ "status_code": 200, "response_data": {} })));
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decode_json_html_yields_none_with_warning() {
        let (value, diagnostic) =
            decode_json(b"<html></html>", Some("text/html; charset=UTF-8")).unwrap();
        assert!(value.is_none());
        assert!(matches!(
            diagnostic,
            Some(Diagnostic::UnexpectedContentType(Some(_)))
        ));
    }

    #[test]
    fn test_decode_json_missing_content_type_yields_none() {
        let (value, diagnostic) = decode_json(PLAIN, None).unwrap();
        assert!(value.is_none());
        assert_eq!(diagnostic, Some(Diagnostic::UnexpectedContentType(None)));
    }

    #[test]
    fn test_decode_json_latin1_charset_transcodes() {
        let body = b"{\"status_code\":200,\"response_data\":{\"name\":\"caf\xe9\"}}";

        let (value, diagnostic) =
            decode_json(body, Some("application/json; charset=ISO-8859-1")).unwrap();

        assert_eq!(
            value,
            Some(json!({ "status_code": 200, "response_data": { "name": "café" } }))
        );
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decode_json_shift_jis_charset_transcodes() {
        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode(r#"{"name":"学院生"}"#);

        let (value, diagnostic) =
            decode_json(&encoded, Some("application/json; charset=Shift_JIS")).unwrap();

        assert_eq!(value, Some(json!({ "name": "学院生" })));
        assert!(diagnostic.is_none());
    }

    #[test]
    fn test_decode_json_unknown_charset_yields_none() {
        let (value, diagnostic) =
            decode_json(PLAIN, Some("application/json; charset=x-klingon")).unwrap();
        assert!(value.is_none());
        assert_eq!(
            diagnostic,
            Some(Diagnostic::UnsupportedCharset("x-klingon".into()))
        );
    }

    #[test]
    fn test_decode_json_invalid_utf8_fails() {
        let result = decode_json(b"{\"a\":\"\xff\"}", Some("application/json; charset=utf-8"));
        assert!(matches!(result, Err(TransportError::InvalidCharset(_))));
    }

    #[test]
    fn test_decode_json_invalid_body_fails() {
        let result = decode_json(b"{", Some("application/json"));
        assert!(matches!(result, Err(TransportError::InvalidBody(_))));
    }
}
