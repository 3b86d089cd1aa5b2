//! The session record: who the client is logged in as, and its counters.
//!
//! A session tracks:
//! - WHO the client is (`login_key`, `user_id`)
//! - HOW it authorizes (`token`, reissued on login and sometimes mid-session)
//! - WHERE it is in the request sequence (`nonce`, `command_number`)

use std::time::SystemTime;

use sifemu_protocol::{CommandTag, UserId};

use crate::WebviewCache;

/// The mutable state of one logical client session.
///
/// ## Lifecycle
///
/// ```text
/// new()/reset() ──→ adopt_token() ──→ record_login() ──→ calls...
///      ▲          (auth key issued)   (login response)       │
///      └──────────────────── start a new session ────────────┘
/// ```
///
/// ## Counters
///
/// - `nonce` is consumed by every physical HTTP attempt, retries and
///   webview fetches included. It never repeats within a session.
/// - `command_number` is consumed once per single-command logical call.
///   Retries reuse it; batched calls don't touch it.
///
/// Both counters hand out the value *after* incrementing, so the first
/// nonce of a fresh session is 1.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    login_key: Option<String>,
    user_id: Option<UserId>,
    token: Option<String>,
    nonce: u64,
    command_number: u64,
    last_login: Option<SystemTime>,
    webview: WebviewCache,
}

impl SessionState {
    /// Creates an empty session: no identity, no token, counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field back to its initial value.
    ///
    /// Called at session start, before a new auth key is requested.
    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::debug!("session state reset");
    }

    /// Records a successful login (or new-account startup).
    ///
    /// The login exchange itself counts as command 1, so the next single
    /// call is command 2.
    pub fn record_login(&mut self, login_key: impl Into<String>, user_id: UserId) {
        self.login_key = Some(login_key.into());
        self.user_id = Some(user_id);
        self.command_number = 1;
        self.last_login = Some(SystemTime::now());
        tracing::info!(%user_id, "login recorded");
    }

    /// Advances and returns the nonce for one physical attempt.
    pub fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    /// Advances and returns the command number for one single call.
    pub fn next_command_number(&mut self) -> u64 {
        self.command_number += 1;
        self.command_number
    }

    /// Advances the command number and pairs it with the login key.
    ///
    /// Before any login the key segment is empty, which the server accepts
    /// for pre-login calls.
    pub fn next_command_tag(&mut self) -> CommandTag {
        let number = self.next_command_number();
        CommandTag {
            login_key: self.login_key.clone().unwrap_or_default(),
            number,
        }
    }

    /// Replaces the authorization token with one the server just issued.
    pub fn adopt_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
        tracing::info!("adopted authorization token");
    }

    pub fn login_key(&self) -> Option<&str> {
        self.login_key.as_deref()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The last nonce handed out (0 before the first exchange).
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The last command number handed out or recorded.
    pub fn command_number(&self) -> u64 {
        self.command_number
    }

    pub fn last_login(&self) -> Option<SystemTime> {
        self.last_login
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn webview(&self) -> &WebviewCache {
        &self.webview
    }

    pub fn webview_mut(&mut self) -> &mut WebviewCache {
        &mut self.webview
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use sifemu_protocol::HeaderSet;

    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = SessionState::new();

        assert_eq!(session.login_key(), None);
        assert_eq!(session.user_id(), None);
        assert_eq!(session.token(), None);
        assert_eq!(session.nonce(), 0);
        assert_eq!(session.command_number(), 0);
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_next_nonce_strictly_increases_from_one() {
        let mut session = SessionState::new();

        let nonces: Vec<_> = (0..5).map(|_| session.next_nonce()).collect();

        assert_eq!(nonces, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_next_command_tag_without_login_has_empty_key() {
        let mut session = SessionState::new();

        let tag = session.next_command_tag();

        assert_eq!(tag.login_key, "");
        assert_eq!(tag.number, 1);
    }

    #[test]
    fn test_record_login_sets_identity_and_command_one() {
        let mut session = SessionState::new();
        session.next_command_number();
        session.next_command_number();
        session.next_command_number();

        session.record_login("key", UserId(77));

        assert_eq!(session.login_key(), Some("key"));
        assert_eq!(session.user_id(), Some(UserId(77)));
        assert_eq!(session.command_number(), 1);
        assert!(session.last_login().is_some());
        assert_eq!(session.next_command_tag().number, 2);
    }

    #[test]
    fn test_command_numbers_after_login_have_no_gaps() {
        let mut session = SessionState::new();
        session.record_login("key", UserId(1));

        let numbers: Vec<_> =
            (0..4).map(|_| session.next_command_number()).collect();

        assert_eq!(numbers, [2, 3, 4, 5]);
    }

    #[test]
    fn test_adopt_token_overwrites() {
        let mut session = SessionState::new();
        session.adopt_token("first");
        session.adopt_token("second");
        assert_eq!(session.token(), Some("second"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = SessionState::new();
        session.adopt_token("tok");
        session.record_login("key", UserId(1));
        session.next_nonce();
        session.webview_mut().get_or_build(HeaderSet::new);

        session.reset();

        assert_eq!(session.token(), None);
        assert_eq!(session.login_key(), None);
        assert_eq!(session.nonce(), 0);
        assert_eq!(session.command_number(), 0);
        assert!(!session.webview().is_cached());
    }
}
