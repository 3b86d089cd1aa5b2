//! Login credentials and their generation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sifemu_protocol::Fields;

/// A `login_key` / `login_passwd` pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login_key: String,
    pub login_passwd: String,
}

impl Credentials {
    pub fn new(login_key: impl Into<String>, login_passwd: impl Into<String>) -> Self {
        Self {
            login_key: login_key.into(),
            login_passwd: login_passwd.into(),
        }
    }

    /// Generates a fresh random pair the way a new install does:
    /// an `8-4-4-4-12` hex login key and a 128-hex-digit password.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let login_key = format!(
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            rng.random::<u32>(),
            rng.random::<u16>(),
            rng.random::<u16>(),
            rng.random::<u16>(),
            rng.random_range(0..(1u64 << 48)),
        );
        let login_passwd: String = (0..4)
            .map(|_| format!("{:032x}", rng.random::<u128>()))
            .collect();
        tracing::debug!(%login_key, "generated credentials");
        Self {
            login_key,
            login_passwd,
        }
    }

    /// The credential fields of a login-family request body.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("login_key".into(), Value::from(self.login_key.as_str()));
        fields.insert("login_passwd".into(), Value::from(self.login_passwd.as_str()));
        fields
    }
}

// The password never shows up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login_key", &self.login_key)
            .field("login_passwd", &"<redacted>")
            .finish()
    }
}
