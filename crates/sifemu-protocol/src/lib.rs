//! Wire protocol for sifemu.
//!
//! This crate defines what a game-client request looks like before it hits
//! the network:
//!
//! - **Descriptors** ([`RequestDescriptor`]): declarative, reusable
//!   descriptions of one API operation (target plus field contract).
//! - **Envelopes** ([`Envelope`], [`Body`], [`RequestShape`]): the ordered
//!   field sets that become the `request_data` JSON.
//! - **Headers** ([`HeaderSet`], [`DeviceProfile`], [`Authorize`],
//!   [`HeaderSigner`]): the signed transport headers.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while building or
//!   reading protocol data.
//!
//! # Architecture
//!
//! The protocol layer sits between the caller's intent and the transport.
//! It never touches the network and never mutates session state; callers
//! hand it the counters and tokens it needs.
//!
//! ```text
//! Descriptor + args → Envelope → (stamp per attempt) → JSON → signed headers
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod descriptor;
mod error;
mod headers;
mod oracle;
mod signer;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, JsonCodec};
pub use descriptor::{CallKind, RequestDescriptor};
pub use error::ProtocolError;
pub use headers::{Authorize, DeviceProfile, HeaderSet, WebviewProfile};
pub use oracle::IntegrityOracle;
pub use signer::{HeaderSigner, SigningInput};
pub use types::{
    ApiResponse, Body, CommandTag, Envelope, Fields, RequestShape, UserId,
    ACTION, COMMAND_NUM, MODULE, TIME_STAMP,
};
