//! Core protocol types: request shapes, envelopes, bodies, and responses.
//!
//! Everything here is plain data. The only "behavior" is stamping, which
//! fills the per-attempt slots (`timeStamp`, `commandNum`) of an envelope
//! right before it is encoded.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CallKind, ProtocolError, RequestDescriptor};

/// An ordered JSON object. `serde_json` is built with `preserve_order`, so
/// keys serialize in insertion order, which is how the game client lays
/// out its request bodies.
pub type Fields = serde_json::Map<String, Value>;

/// Name of the module (domain grouping) field.
pub const MODULE: &str = "module";
/// Name of the action (operation) field.
pub const ACTION: &str = "action";
/// Name of the per-attempt unix timestamp slot.
pub const TIME_STAMP: &str = "timeStamp";
/// Name of the per-command sequence slot.
pub const COMMAND_NUM: &str = "commandNum";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The server-assigned numeric account identifier.
///
/// Serialized as the bare integer, and displayed as bare digits because
/// that's exactly what goes into the `User-ID` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The command-sequence part of a single call's `commandNum`.
///
/// The timestamp is not stored here: it is chosen per attempt, while the
/// command number is fixed for the whole logical call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTag {
    /// Login key of the current account; empty before any login.
    pub login_key: String,
    /// Command number, already incremented for this call.
    pub number: u64,
}

impl CommandTag {
    /// Renders `{loginKey}.{timestamp}.{commandNumber}`.
    pub fn render(&self, timestamp: u64) -> String {
        format!("{}.{}.{}", self.login_key, timestamp, self.number)
    }
}

// ---------------------------------------------------------------------------
// RequestShape
// ---------------------------------------------------------------------------

/// How a caller describes one command without a descriptor.
///
/// The game client sometimes sends the bare `(module, action)` default
/// body and sometimes a hand-ordered mapping. Both resolve to an
/// [`Envelope`] exactly once, in [`RequestShape::into_envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum RequestShape {
    /// The default envelope for `module`/`action`.
    Single { module: String, action: String },
    /// A caller-ordered mapping, sent as-is apart from slot stamping.
    Raw(Fields),
}

impl RequestShape {
    /// Shorthand for [`RequestShape::Single`].
    pub fn single(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Single {
            module: module.into(),
            action: action.into(),
        }
    }

    /// Returns the `(module, action)` pair this shape targets, if it has one.
    pub fn target(&self) -> Option<(&str, &str)> {
        match self {
            Self::Single { module, action } => Some((module, action)),
            Self::Raw(fields) => target_of(fields),
        }
    }

    /// Returns the default request path `/main.php/{module}/{action}`.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownTarget`] if a raw shape lacks string
    /// `module`/`action` fields.
    pub fn path(&self) -> Result<String, ProtocolError> {
        let (module, action) = self.target().ok_or_else(|| {
            ProtocolError::UnknownTarget(
                "request has no module/action fields".into(),
            )
        })?;
        Ok(format!("/main.php/{module}/{action}"))
    }

    /// Resolves the shape into an envelope for the given kind of call.
    pub fn into_envelope(self, kind: CallKind) -> Envelope {
        match self {
            Self::Single { module, action } => {
                RequestDescriptor::new(module, action).default_envelope(kind)
            }
            Self::Raw(fields) => Envelope::from_fields(fields),
        }
    }
}

impl<M: Into<String>, A: Into<String>> From<(M, A)> for RequestShape {
    fn from((module, action): (M, A)) -> Self {
        Self::single(module, action)
    }
}

impl From<Fields> for RequestShape {
    fn from(fields: Fields) -> Self {
        Self::Raw(fields)
    }
}

impl From<Envelope> for RequestShape {
    fn from(envelope: Envelope) -> Self {
        Self::Raw(envelope.into_fields())
    }
}

fn target_of(fields: &Fields) -> Option<(&str, &str)> {
    let module = fields.get(MODULE)?.as_str()?;
    let action = fields.get(ACTION)?.as_str()?;
    Some((module, action))
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The ordered field set of one API command.
///
/// `timeStamp` and `commandNum` are *slots*: they are present as `null`
/// placeholders until [`Envelope::stamp`] fills them for one attempt. A
/// field that was excluded (or never placed) is never stamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Fields);

impl Envelope {
    /// Creates an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing ordered mapping.
    pub fn from_fields(fields: Fields) -> Self {
        Self(fields)
    }

    /// Borrows the underlying mapping.
    pub fn fields(&self) -> &Fields {
        &self.0
    }

    /// Unwraps into the underlying mapping.
    pub fn into_fields(self) -> Fields {
        self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Inserts or overwrites a field. Overwriting keeps the key's position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a field, keeping the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the `(module, action)` pair, if present.
    pub fn target(&self) -> Option<(&str, &str)> {
        target_of(&self.0)
    }

    /// Returns a copy with the per-attempt slots filled.
    ///
    /// - `timeStamp`, if present, becomes `timestamp`.
    /// - `commandNum`, if present, becomes the rendered `command` tag;
    ///   without a tag (batched calls) the slot is dropped.
    pub fn stamp(&self, timestamp: u64, command: Option<&CommandTag>) -> Self {
        let mut stamped = self.clone();
        if stamped.contains(TIME_STAMP) {
            stamped.insert(TIME_STAMP, timestamp);
        }
        if stamped.contains(COMMAND_NUM) {
            match command {
                Some(tag) => stamped.insert(COMMAND_NUM, tag.render(timestamp)),
                None => {
                    stamped.remove(COMMAND_NUM);
                }
            }
        }
        stamped
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// A complete request body: one command (a JSON object) or a batch (a JSON
/// array of objects).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Body {
    Single(Envelope),
    Batch(Vec<Envelope>),
}

impl Body {
    /// Builds a single-command body. `None` stays `None`: some calls
    /// (issuing an auth key) have no body at all.
    pub fn single(shape: Option<RequestShape>) -> Option<Self> {
        shape.map(|s| Self::Single(s.into_envelope(CallKind::Single)))
    }

    /// Builds a batch body from a sequence of shapes.
    pub fn batch<I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = RequestShape>,
    {
        Self::Batch(
            shapes
                .into_iter()
                .map(|s| s.into_envelope(CallKind::Batched))
                .collect(),
        )
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Stamps every command with the shared `timestamp`. Batch members
    /// never carry a `commandNum`, so `command` only applies to
    /// [`Body::Single`].
    pub fn stamp(&self, timestamp: u64, command: Option<&CommandTag>) -> Self {
        match self {
            Self::Single(envelope) => {
                Self::Single(envelope.stamp(timestamp, command))
            }
            Self::Batch(envelopes) => Self::Batch(
                envelopes.iter().map(|e| e.stamp(timestamp, None)).collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiResponse
// ---------------------------------------------------------------------------

/// The application-level result carried in a decoded response body.
///
/// A `status_code` other than [`ApiResponse::SUCCESS`] is *data*, not an
/// error: interpreting domain error codes is up to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status_code: i64,
    pub response_data: Value,
}

impl ApiResponse {
    pub const SUCCESS: i64 = 200;

    /// Reads an `ApiResponse` out of a decoded JSON value.
    ///
    /// # Errors
    /// [`ProtocolError::MalformedResponse`] if the value isn't an object, or
    /// lacks either `status_code` or `response_data`. No defaults are
    /// guessed for missing keys.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let object = value.as_object().ok_or_else(|| {
            ProtocolError::MalformedResponse("expected a JSON object".into())
        })?;
        let status_code = object
            .get("status_code")
            .ok_or_else(|| {
                ProtocolError::MalformedResponse("missing status_code".into())
            })?
            .as_i64()
            .ok_or_else(|| {
                ProtocolError::MalformedResponse(
                    "status_code is not an integer".into(),
                )
            })?;
        let response_data = object.get("response_data").cloned().ok_or_else(
            || ProtocolError::MalformedResponse("missing response_data".into()),
        )?;
        Ok(Self {
            status_code,
            response_data,
        })
    }

    /// Reads the responses of a batched exchange, one per command, in
    /// request order.
    ///
    /// Accepts a bare JSON array of responses, or a single response whose
    /// `response_data` is that array. Members of the wrapped form may use
    /// the short `status`/`result` keys instead of
    /// `status_code`/`response_data`.
    ///
    /// # Errors
    /// [`ProtocolError::MalformedResponse`] if the value is neither shape,
    /// or any member lacks its status or data.
    pub fn batch_from_value(value: &Value) -> Result<Vec<Self>, ProtocolError> {
        let members = match value {
            Value::Array(members) => members,
            Value::Object(object) => object
                .get("response_data")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    ProtocolError::MalformedResponse(
                        "batch response_data is not an array".into(),
                    )
                })?,
            _ => {
                return Err(ProtocolError::MalformedResponse(
                    "expected a JSON array or object".into(),
                ));
            }
        };
        members.iter().map(Self::from_batch_member).collect()
    }

    fn from_batch_member(value: &Value) -> Result<Self, ProtocolError> {
        let short = value
            .as_object()
            .filter(|o| !o.contains_key("status_code") && o.contains_key("result"));
        let Some(object) = short else {
            return Self::from_value(value);
        };
        let status_code =
            object.get("status").and_then(Value::as_i64).ok_or_else(|| {
                ProtocolError::MalformedResponse(
                    "batch member has no integer status".into(),
                )
            })?;
        let response_data = object.get("result").cloned().unwrap_or_default();
        Ok(Self {
            status_code,
            response_data,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code == Self::SUCCESS
    }

    /// Looks up a field of `response_data`.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.response_data.get(key)
    }

    /// The application error code (`response_data.error_code`), if any.
    pub fn error_code(&self) -> Option<i64> {
        self.field("error_code").and_then(Value::as_i64)
    }

    /// A freshly issued authorization token, if the server sent one.
    pub fn authorize_token(&self) -> Option<&str> {
        self.field("authorize_token").and_then(Value::as_str)
    }

    /// The account's user id, if present.
    pub fn user_id(&self) -> Option<UserId> {
        self.field("user_id").and_then(Value::as_u64).map(UserId)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn tag(key: &str, number: u64) -> CommandTag {
        CommandTag {
            login_key: key.into(),
            number,
        }
    }

    #[test]
    fn test_command_tag_render_joins_with_dots() {
        assert_eq!(tag("abc", 7).render(1_500_000_000), "abc.1500000000.7");
    }

    #[test]
    fn test_command_tag_render_without_login_key_has_empty_segment() {
        assert_eq!(tag("", 1).render(42), ".42.1");
    }

    #[test]
    fn test_shape_single_path_uses_main_php() {
        let shape = RequestShape::single("user", "userInfo");
        assert_eq!(shape.path().unwrap(), "/main.php/user/userInfo");
    }

    #[test]
    fn test_shape_raw_path_reads_module_and_action() {
        let shape = RequestShape::Raw(fields(json!({
            "module": "tos", "action": "tosAgree", "tos_id": 3
        })));
        assert_eq!(shape.path().unwrap(), "/main.php/tos/tosAgree");
    }

    #[test]
    fn test_shape_raw_path_without_target_fails() {
        let shape = RequestShape::Raw(fields(json!({ "login_key": "k" })));
        assert!(matches!(
            shape.path(),
            Err(ProtocolError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_stamp_fills_present_slots_only() {
        let envelope = Envelope::from_fields(fields(json!({
            "module": "reward", "action": "open",
            "timeStamp": null, "incentive_id": 9, "commandNum": null
        })));

        let stamped = envelope.stamp(100, Some(&tag("key", 3)));

        assert_eq!(stamped.get(TIME_STAMP), Some(&json!(100)));
        assert_eq!(stamped.get(COMMAND_NUM), Some(&json!("key.100.3")));
        // Key order survives stamping.
        let keys: Vec<_> = stamped.fields().keys().cloned().collect();
        assert_eq!(
            keys,
            ["module", "action", "timeStamp", "incentive_id", "commandNum"]
        );
    }

    #[test]
    fn test_stamp_leaves_envelope_without_slots_untouched() {
        let envelope = Envelope::from_fields(fields(json!({
            "module": "platformAccount", "action": "isConnectedLlAccount"
        })));

        let stamped = envelope.stamp(100, Some(&tag("key", 3)));

        assert_eq!(stamped, envelope);
    }

    #[test]
    fn test_stamp_without_tag_drops_command_slot() {
        let envelope = RequestShape::single("unit", "unitAll")
            .into_envelope(CallKind::Single);

        let stamped = envelope.stamp(5, None);

        assert!(!stamped.contains(COMMAND_NUM));
        assert_eq!(stamped.get(TIME_STAMP), Some(&json!(5)));
    }

    #[test]
    fn test_body_single_none_stays_none() {
        assert!(Body::single(None).is_none());
    }

    #[test]
    fn test_body_batch_serializes_as_array_with_shared_timestamp() {
        let body = Body::batch([
            RequestShape::single("login", "topInfo"),
            RequestShape::Raw(fields(json!({
                "module": "reward", "action": "rewardList",
                "timeStamp": null, "order": 0, "commandNum": null
            }))),
        ]);

        let stamped = body.stamp(77, Some(&tag("ignored", 1)));
        let json = serde_json::to_value(&stamped).unwrap();

        assert_eq!(
            json,
            json!([
                { "module": "login", "action": "topInfo", "timeStamp": 77 },
                { "module": "reward", "action": "rewardList",
                  "timeStamp": 77, "order": 0 }
            ])
        );
    }

    #[test]
    fn test_api_response_from_value_reads_fields() {
        let value = json!({
            "response_data": { "authorize_token": "tok", "user_id": 12 },
            "status_code": 200
        });

        let response = ApiResponse::from_value(&value).unwrap();

        assert!(response.is_success());
        assert_eq!(response.authorize_token(), Some("tok"));
        assert_eq!(response.user_id(), Some(UserId(12)));
        assert_eq!(response.error_code(), None);
    }

    #[test]
    fn test_api_response_missing_status_code_is_malformed() {
        let value = json!({ "response_data": {} });
        assert!(matches!(
            ApiResponse::from_value(&value),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_api_response_missing_response_data_is_malformed() {
        let value = json!({ "status_code": 200 });
        assert!(matches!(
            ApiResponse::from_value(&value),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_api_response_error_code_from_application_error() {
        let value = json!({
            "response_data": { "error_code": 407 }, "status_code": 600
        });

        let response = ApiResponse::from_value(&value).unwrap();

        assert!(!response.is_success());
        assert_eq!(response.error_code(), Some(407));
    }

    #[test]
    fn test_api_response_batch_keeps_request_order() {
        let value = json!([
            { "status_code": 200, "response_data": { "n": 1 } },
            { "status_code": 200, "response_data": { "n": 2 } }
        ]);

        let responses = ApiResponse::batch_from_value(&value).unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].field("n"), Some(&json!(2)));
    }

    #[test]
    fn test_api_response_batch_reads_wrapped_members() {
        let value = json!({
            "response_data": [
                { "result": [{ "unit_owning_user_id": 5 }], "status": 200, "commandNum": false },
                { "result": { "error_code": 1 }, "status": 600 }
            ],
            "status_code": 200
        });

        let responses = ApiResponse::batch_from_value(&value).unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(
            responses[0].response_data[0]["unit_owning_user_id"],
            json!(5)
        );
        assert_eq!(responses[1].status_code, 600);
        assert_eq!(responses[1].error_code(), Some(1));
    }

    #[test]
    fn test_api_response_batch_wrapped_without_array_is_malformed() {
        let value = json!({ "response_data": { "n": 1 }, "status_code": 200 });
        assert!(matches!(
            ApiResponse::batch_from_value(&value),
            Err(ProtocolError::MalformedResponse(_))
        ));
    }
}
