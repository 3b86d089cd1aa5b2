//! The integrity oracle: the externally supplied `X-Message-Code` function.
//!
//! sifemu doesn't know how the server computes message codes. That's the
//! caller's job: supply an [`IntegrityOracle`] when constructing the client
//! and the signer calls it for every request body (and the transport for
//! every response body that carries a code).
//!
//! Any `Fn(&[u8]) -> String` closure is an oracle:
//!
//! ```rust
//! use sifemu_protocol::IntegrityOracle;
//!
//! let oracle = |data: &[u8]| format!("{:x}", data.len());
//! assert_eq!(oracle.sign(b"hello"), "5");
//! ```

/// Computes the message code for a byte string.
///
/// Must be deterministic and match the server's algorithm, otherwise every
/// request is rejected.
pub trait IntegrityOracle: Send + Sync + 'static {
    /// Returns the message code for `data`.
    fn sign(&self, data: &[u8]) -> String;

    /// Returns `true` if `code` is the message code for `data`.
    fn verify(&self, data: &[u8], code: &str) -> bool {
        self.sign(data) == code
    }
}

impl<F> IntegrityOracle for F
where
    F: Fn(&[u8]) -> String + Send + Sync + 'static,
{
    fn sign(&self, data: &[u8]) -> String {
        self(data)
    }
}
