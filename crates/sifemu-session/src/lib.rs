//! Client session state for sifemu.
//!
//! This crate owns the mutable bookkeeping a real game client keeps between
//! requests:
//!
//! 1. **Identity**: login key, user id, and the current authorization token
//! 2. **Counters**: the per-exchange nonce and the per-command number, both
//!    strictly increasing ([`SessionState`])
//! 3. **Webview headers**: a lazily built header set reused until cleared
//!    ([`WebviewCache`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)     ← advances counters per call, adopts tokens from responses
//!     ↕
//! Session (this crate)
//!     ↕
//! Protocol (below)   ← provides UserId, CommandTag, HeaderSet
//! ```
//!
//! Nothing here is thread-safe, and nothing needs to be: one session is
//! driven sequentially, and every transition takes `&mut self`.

mod session;
mod webview;

pub use session::SessionState;
pub use webview::WebviewCache;
