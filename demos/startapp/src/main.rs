//! Simulates launching the game client against the live server.
//!
//! Environment:
//!
//! - `SIF_LOGIN_KEY` / `SIF_LOGIN_PASSWD`: an existing account; when unset,
//!   a new account is registered and its credentials printed
//! - `SIF_MESSAGE_KEY`: key for the message-code oracle
//! - `SIF_BASE_URL`: overrides the default server
//! - `RUST_LOG`: log filter (default `info`)
//!
//! The oracle here is a keyed SHA-256 stand-in. The real server uses its
//! own algorithm, which you have to supply for requests to be accepted.

use sha2::{Digest, Sha256};
use sifemu::prelude::*;

/// `hex(sha256(key || data))`.
fn keyed_oracle(key: Vec<u8>) -> impl IntegrityOracle {
    move |data: &[u8]| {
        let mut hasher = Sha256::new();
        hasher.update(&key);
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = ClientConfig::default();
    if let Ok(base_url) = std::env::var("SIF_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    let key = std::env::var("SIF_MESSAGE_KEY").unwrap_or_default();
    let mut client = ApiClient::connect(config, keyed_oracle(key.into_bytes()))?;

    let credentials = match (std::env::var("SIF_LOGIN_KEY"), std::env::var("SIF_LOGIN_PASSWD")) {
        (Ok(key), Ok(passwd)) => Credentials::new(key, passwd),
        _ => {
            let credentials = Credentials::generate();
            client
                .register_account(&credentials, &AccountSetup::default())
                .await?;
            println!("login_key={}", credentials.login_key);
            println!("login_passwd={}", credentials.login_passwd);
            credentials
        }
    };

    let launch = client.startapp(&credentials).await?;
    tracing::info!(user_id = ?client.session().user_id(), "launched");
    println!("{}", launch.user_info.response_data);

    if let Some(version) = client.server_version() {
        if version != client.profile().client_version {
            tracing::warn!(%version, "server runs a newer client version");
        }
    }
    Ok(())
}
