//! The header signer: builds the full header set for one request.

use crate::{Authorize, DeviceProfile, HeaderSet, IntegrityOracle, UserId};

/// Everything the signer needs to know about one physical attempt.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    /// Unix seconds of this attempt.
    pub timestamp: u64,
    /// The JSON request body, before multipart encoding.
    pub body: Option<&'a [u8]>,
    /// The session nonce consumed by this attempt.
    pub nonce: u64,
    pub user_id: Option<UserId>,
    pub token: Option<&'a str>,
}

/// Assembles signed request headers from a device profile and an
/// injected [`IntegrityOracle`].
///
/// The signer never encodes bodies and never sets `Content-Length` or
/// `Content-Type`; the transport step adds those once the multipart body
/// exists.
#[derive(Debug, Clone)]
pub struct HeaderSigner<O> {
    profile: DeviceProfile,
    oracle: O,
}

impl<O: IntegrityOracle> HeaderSigner<O> {
    pub fn new(profile: DeviceProfile, oracle: O) -> Self {
        Self { profile, oracle }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Mutable access, e.g. to adopt a newer client version.
    pub fn profile_mut(&mut self) -> &mut DeviceProfile {
        &mut self.profile
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Builds the API header set for one attempt.
    ///
    /// - `Authorize` carries the token only once one exists.
    /// - `User-ID` is omitted, not sent empty, while the user is unknown.
    /// - `X-Message-Code` is present iff there is a body.
    pub fn sign(&self, input: &SigningInput<'_>) -> HeaderSet {
        let mut headers = self.profile.api_headers();

        let authorize = Authorize::api(input.timestamp, input.nonce, input.token);
        headers.push("Authorize", authorize.to_string());

        if let Some(user_id) = input.user_id {
            headers.push("User-ID", user_id.to_string());
        }
        if let Some(body) = input.body {
            headers.push("X-Message-Code", self.oracle.sign(body));
        }

        tracing::trace!(
            nonce = input.nonce,
            timestamp = input.timestamp,
            has_body = input.body.is_some(),
            "signed request headers"
        );
        headers
    }

    /// Builds the webview header set: fixed nonce sentinel, no message code.
    pub fn webview_headers(
        &self,
        timestamp: u64,
        user_id: Option<UserId>,
        token: Option<&str>,
    ) -> HeaderSet {
        let authorize = Authorize::webview(timestamp, token);
        self.profile.webview_headers(&authorize, user_id)
    }
}
