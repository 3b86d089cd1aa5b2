//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sifemu_protocol::DeviceProfile;

/// Default game server for the Japanese edition.
pub const DEFAULT_BASE_URL: &str = "http://prod-jp.lovelive.ge.klabgames.net";

/// Configuration for an [`ApiClient`](crate::ApiClient).
///
/// Plain data with `Serialize`/`Deserialize`, so it can be loaded from
/// whatever format the caller prefers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme and host of the game server, without a trailing slash.
    pub base_url: String,

    /// Client identity headers.
    pub profile: DeviceProfile,

    /// Physical attempts per logical API call.
    pub max_attempts: u32,

    /// Per-attempt timeout on the API path.
    pub request_timeout: Duration,

    /// Timeout of a webview page fetch.
    pub webview_timeout: Duration,

    /// Path batched calls are posted to.
    pub batch_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            profile: DeviceProfile::default(),
            max_attempts: 10,
            request_timeout: Duration::from_secs(10),
            webview_timeout: Duration::from_secs(20),
            batch_path: "/main.php/api".to_string(),
        }
    }
}

impl ClientConfig {
    /// Targets a different server, keeping everything else.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_android_client() {
        let config = ClientConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.batch_path, "/main.php/api");
        assert_eq!(config.profile.client_version, "17.3");
    }

    #[test]
    fn test_config_survives_json_round_trip() {
        let config = ClientConfig::default()
            .with_profile(DeviceProfile::ios())
            .with_max_attempts(3);

        let json = serde_json::to_string(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(back, config);
    }
}
