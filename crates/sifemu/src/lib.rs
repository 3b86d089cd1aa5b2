//! # sifemu
//!
//! Client-side emulator for the School Idol Festival game API.
//!
//! sifemu reproduces the framing, header signing, and session bookkeeping
//! of the real game client, so sessions (account creation, login, gameplay
//! calls) can be driven from code. The layers:
//!
//! - [`sifemu_protocol`]: descriptors, envelopes, header signing
//! - [`sifemu_session`]: the per-session counters and identity
//! - [`sifemu_transport`]: HTTP exchange, retries, response validation
//! - this crate: [`ApiClient`], the named game flows, and the catalog
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sifemu::prelude::*;
//!
//! # async fn run() -> Result<(), ClientError> {
//! // The server's message-code algorithm is not part of sifemu.
//! let oracle = |data: &[u8]| format!("{:040x}", data.len());
//! let mut client = ApiClient::connect(ClientConfig::default(), oracle)?;
//!
//! let credentials = Credentials::new("login-key", "login-passwd");
//! let launch = client.startapp(&credentials).await?;
//! println!("{:?}", launch.user_info.response_data);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod client;
mod config;
mod credentials;
mod error;
mod flows;

pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use credentials::Credentials;
pub use error::ClientError;
pub use flows::{
    AccountSetup, ERROR_TRANSFER_CODE_INCORRECT, ERROR_TRANSFER_CODE_USED, Startapp, TosState,
};

/// Convenience re-exports for client code.
///
/// ```rust
/// use sifemu::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AccountSetup, ApiClient, ClientConfig, ClientError, Credentials, Startapp, TosState,
    };

    pub use sifemu_protocol::{
        ApiResponse, CallKind, DeviceProfile, Fields, IntegrityOracle, RequestDescriptor,
        RequestShape, UserId,
    };
    pub use sifemu_session::SessionState;
    pub use sifemu_transport::{
        Diagnostic, Exchange, HttpExchange, HttpRequest, HttpResponse, ReqwestExchange,
        TransportError,
    };
}
