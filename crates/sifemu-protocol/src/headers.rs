//! Ordered header sets, device identity, and the `Authorize` field.
//!
//! The game client sends its headers in a fixed order, and the `Authorize`
//! value is itself an ordered `key=value&...` string. Both are modeled as
//! explicit sequences rather than maps so the order is part of the type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Consumer key embedded in every `Authorize` value.
pub const CONSUMER_KEY: &str = "lovelive_test";
/// Authorization protocol version embedded in every `Authorize` value.
pub const AUTHORIZE_VERSION: &str = "1.1";
/// Nonce sentinel used by the webview header set.
pub const WEBVIEW_NONCE: &str = "WV0";

// ---------------------------------------------------------------------------
// HeaderSet
// ---------------------------------------------------------------------------

/// An ordered list of `(name, value)` header pairs.
///
/// Names keep the casing they were inserted with; lookups are
/// case-insensitive, matching HTTP semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<(String, String)>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header without checking for an existing one.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Replaces the first header with this name in place, or appends it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.0[i].1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Returns the first value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.0[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes every header with this name and returns the first value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let first = self.position(name).map(|i| self.0[i].1.clone());
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        first
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Header names in order, as inserted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// DeviceProfile
// ---------------------------------------------------------------------------

/// The fixed client-identity values sent with every API request.
///
/// `client_version` must match the server's current version or the server
/// asks the client to update; see the `server-version` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub accept: String,
    pub accept_encoding: String,
    pub api_model: String,
    /// `Debug` header; omitted when `None`.
    pub debug: Option<String>,
    pub bundle_version: String,
    pub client_version: String,
    pub os_version: String,
    pub os: String,
    pub platform_type: String,
    pub application_id: String,
    pub time_zone: String,
    pub region: String,
    /// API user agent; omitted when `None`.
    pub user_agent: Option<String>,
    /// API `Accept-Language`; omitted when `None`.
    pub accept_language: Option<String>,
    /// Identity used on the webview path.
    pub webview: WebviewProfile,
}

/// The browser-like identity of the in-game webview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebviewProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_encoding: String,
    pub accept_language: String,
    /// `X-Requested-With`; omitted when `None`.
    pub requested_with: Option<String>,
}

impl Default for DeviceProfile {
    /// The Japanese Android client.
    fn default() -> Self {
        Self {
            accept: "*/*".into(),
            accept_encoding: "gzip,deflate".into(),
            api_model: "straightforward".into(),
            debug: Some("1".into()),
            bundle_version: "3.2.1".into(),
            client_version: "17.3".into(),
            os_version: "Nexus 6 google shamu 5.0".into(),
            os: "Android".into(),
            platform_type: "2".into(),
            application_id: "626776655".into(),
            time_zone: "JST".into(),
            region: "392".into(),
            user_agent: None,
            accept_language: None,
            webview: WebviewProfile {
                user_agent: "Mozilla/5.0 (Linux; Android 4.4.4; XT830C \
                             Build/KXC21.5-40) AppleWebKit/537.36 (KHTML, like \
                             Gecko) Version/4.0 Chrome/33.0.0.0 Mobile \
                             Safari/537.36"
                    .into(),
                accept: "text/html,application/xhtml+xml,application/xml;\
                         q=0.9,image/webp,*/*;q=0.8"
                    .into(),
                accept_encoding: "gzip,deflate".into(),
                accept_language: "en-US".into(),
                requested_with: Some("klb.android.lovelive".into()),
            },
        }
    }
}

impl DeviceProfile {
    /// An iOS client identity.
    pub fn ios() -> Self {
        Self {
            accept: "*/*".into(),
            accept_encoding: "gzip, deflate".into(),
            api_model: "straightforward".into(),
            debug: Some("1".into()),
            bundle_version: "3.2.2".into(),
            client_version: "17.7".into(),
            os_version: "iPhone8_1 iPhone 9.2".into(),
            os: "iOS".into(),
            platform_type: "1".into(),
            application_id: "626776655".into(),
            time_zone: "GMT+8".into(),
            region: "392".into(),
            user_agent: Some(
                "%E3%83%A9%E3%83%95%E3%82%99%E3%83%A9%E3%82%A4%E3%83%95%E3%82%99\
                 %EF%BC%81/3.2.2 CFNetwork/758.2.8 Darwin/15.0.0"
                    .into(),
            ),
            accept_language: Some("zh-cn".into()),
            webview: WebviewProfile {
                user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 9_2_1 like Mac \
                             OS X) AppleWebKit/601.1.46 (KHTML, like Gecko) \
                             Mobile/13D15"
                    .into(),
                accept: "text/html,application/xhtml+xml,application/xml;\
                         q=0.9,*/*;q=0.8"
                    .into(),
                accept_encoding: "gzip, deflate".into(),
                accept_language: "zh-cn".into(),
                requested_with: None,
            },
        }
    }

    /// The identity headers of the API path, in wire order.
    pub fn api_headers(&self) -> HeaderSet {
        let mut headers = HeaderSet::new();
        headers.push("Accept", &self.accept);
        headers.push("Accept-Encoding", &self.accept_encoding);
        headers.push("API-Model", &self.api_model);
        if let Some(debug) = &self.debug {
            headers.push("Debug", debug);
        }
        headers.push("Bundle-Version", &self.bundle_version);
        headers.push("Client-Version", &self.client_version);
        headers.push("OS-Version", &self.os_version);
        headers.push("OS", &self.os);
        headers.push("Platform-Type", &self.platform_type);
        headers.push("Application-ID", &self.application_id);
        headers.push("Time-Zone", &self.time_zone);
        headers.push("Region", &self.region);
        if let Some(agent) = &self.user_agent {
            headers.push("User-Agent", agent);
        }
        if let Some(language) = &self.accept_language {
            headers.push("Accept-Language", language);
        }
        headers
    }

    /// The webview header set. Field names are lower-case, as the
    /// webview sends them.
    pub fn webview_headers(
        &self,
        authorize: &Authorize,
        user_id: Option<UserId>,
    ) -> HeaderSet {
        let webview = &self.webview;
        let mut headers = HeaderSet::new();
        headers.push("Accept", &webview.accept);
        headers.push("User-Agent", &webview.user_agent);
        headers.push("authorize", authorize.to_string());
        headers.push("time-zone", &self.time_zone);
        headers.push("os-version", &self.os_version);
        headers.push("region", &self.region);
        if let Some(user_id) = user_id {
            headers.push("user-id", user_id.to_string());
        }
        headers.push("client-version", &self.client_version);
        headers.push("os", &self.os);
        headers.push("api-model", &self.api_model);
        headers.push("bundle-version", &self.bundle_version);
        headers.push("application-id", &self.application_id);
        headers.push("Accept-Encoding", &webview.accept_encoding);
        headers.push("Accept-Language", &webview.accept_language);
        if let Some(requested_with) = &webview.requested_with {
            headers.push("X-Requested-With", requested_with);
        }
        headers
    }
}

// ---------------------------------------------------------------------------
// Authorize
// ---------------------------------------------------------------------------

/// The signed `Authorize` header value.
///
/// Pairs are kept in their declared order:
/// `consumerKey`, `timeStamp`, `version`, `token` (only when a token
/// exists), `nonce`. `Display` joins them as `key=value` with `&`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorize {
    pairs: Vec<(&'static str, String)>,
}

impl Authorize {
    /// The value for one API exchange.
    pub fn api(timestamp: u64, nonce: u64, token: Option<&str>) -> Self {
        Self::with_nonce(timestamp, nonce.to_string(), token)
    }

    /// The value for the webview path, with the fixed nonce sentinel.
    pub fn webview(timestamp: u64, token: Option<&str>) -> Self {
        Self::with_nonce(timestamp, WEBVIEW_NONCE.to_string(), token)
    }

    fn with_nonce(timestamp: u64, nonce: String, token: Option<&str>) -> Self {
        let mut pairs = vec![
            ("consumerKey", CONSUMER_KEY.to_string()),
            ("timeStamp", timestamp.to_string()),
            ("version", AUTHORIZE_VERSION.to_string()),
        ];
        if let Some(token) = token {
            pairs.push(("token", token.to_string()));
        }
        pairs.push(("nonce", nonce));
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Looks up one pair's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Authorize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_set_get_ignores_case() {
        let mut headers = HeaderSet::new();
        headers.push("Content-Encoding", "gzip");
        assert_eq!(headers.get("content-encoding"), Some("gzip"));
        assert_eq!(headers.get("CONTENT-ENCODING"), Some("gzip"));
    }

    #[test]
    fn test_header_set_set_replaces_in_place() {
        let mut headers: HeaderSet =
            [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();

        headers.set("b", "changed");

        assert_eq!(headers.names().collect::<Vec<_>>(), ["A", "B", "C"]);
        assert_eq!(headers.get("B"), Some("changed"));
    }

    #[test]
    fn test_header_set_remove_drops_all_duplicates() {
        let mut headers = HeaderSet::new();
        headers.push("X", "1");
        headers.push("x", "2");

        assert_eq!(headers.remove("X"), Some("1".to_string()));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_authorize_with_token_keeps_declared_order() {
        let authorize = Authorize::api(1_450_000_000, 3, Some("tok"));
        assert_eq!(
            authorize.to_string(),
            "consumerKey=lovelive_test&timeStamp=1450000000&version=1.1\
             &token=tok&nonce=3"
        );
    }

    #[test]
    fn test_authorize_without_token_omits_pair() {
        let authorize = Authorize::api(10, 1, None);
        assert_eq!(
            authorize.to_string(),
            "consumerKey=lovelive_test&timeStamp=10&version=1.1&nonce=1"
        );
        assert_eq!(authorize.get("token"), None);
    }

    #[test]
    fn test_authorize_webview_uses_sentinel_nonce() {
        let authorize = Authorize::webview(10, Some("tok"));
        assert_eq!(authorize.get("nonce"), Some("WV0"));
    }

    #[test]
    fn test_api_headers_start_with_accept_and_end_with_region() {
        let headers = DeviceProfile::default().api_headers();
        let names: Vec<_> = headers.names().collect();
        assert_eq!(names.first(), Some(&"Accept"));
        assert_eq!(names.last(), Some(&"Region"));
        assert_eq!(headers.get("Client-Version"), Some("17.3"));
    }

    #[test]
    fn test_webview_headers_omit_unknown_user() {
        let profile = DeviceProfile::default();
        let authorize = Authorize::webview(1, None);

        let without = profile.webview_headers(&authorize, None);
        let with = profile.webview_headers(&authorize, Some(UserId(5)));

        assert!(!without.contains("user-id"));
        assert_eq!(with.get("user-id"), Some("5"));
        assert_eq!(with.get("X-Requested-With"), Some("klb.android.lovelive"));
    }

    #[test]
    fn test_ios_profile_has_no_requested_with() {
        let profile = DeviceProfile::ios();
        let headers =
            profile.webview_headers(&Authorize::webview(1, None), None);
        assert!(!headers.contains("X-Requested-With"));
        assert_eq!(profile.api_headers().get("OS"), Some("iOS"));
    }
}
