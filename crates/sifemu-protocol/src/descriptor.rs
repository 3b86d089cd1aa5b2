//! Request descriptors: declarative descriptions of API operations.
//!
//! A descriptor names its target (`module`/`action`) and the contract for
//! caller-supplied arguments. Building an envelope from a descriptor is the
//! only place where that contract is enforced.
//!
//! ```rust
//! use sifemu_protocol::{CallKind, Fields, RequestDescriptor};
//!
//! let agree = RequestDescriptor::new("tos", "tosAgree").requires(["tos_id"]);
//!
//! let mut args = Fields::new();
//! args.insert("tos_id".into(), 1.into());
//! let envelope = agree.build(CallKind::Single, &args).unwrap();
//! assert_eq!(envelope.get("tos_id"), Some(&1.into()));
//! ```

use serde_json::Value;

use crate::types::{ACTION, COMMAND_NUM, MODULE, TIME_STAMP};
use crate::{Envelope, Fields, ProtocolError};

/// Whether an envelope is sent on its own or as part of a batch.
///
/// Only single calls carry a `commandNum` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Single,
    Batched,
}

/// A reusable, immutable description of one API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    module: String,
    action: String,
    requires: Vec<String>,
    options: Vec<String>,
    excludes: Vec<String>,
}

impl RequestDescriptor {
    /// Creates a descriptor with no field contract.
    pub fn new(module: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: action.into(),
            requires: Vec::new(),
            options: Vec::new(),
            excludes: Vec::new(),
        }
    }

    /// Fields that must be supplied, copied in declaration order.
    pub fn requires<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Fields copied only when supplied.
    pub fn options<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Fields removed from the envelope after everything else is placed.
    /// The default slots (`module`, `action`, `timeStamp`, `commandNum`)
    /// are eligible.
    pub fn excludes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn required_fields(&self) -> &[String] {
        &self.requires
    }

    pub fn optional_fields(&self) -> &[String] {
        &self.options
    }

    pub fn excluded_fields(&self) -> &[String] {
        &self.excludes
    }

    /// The request path: `/main.php/{module}/{action}`.
    pub fn uri(&self) -> String {
        format!("/main.php/{}/{}", self.module, self.action)
    }

    /// The envelope with only the default fields, before exclusions.
    pub(crate) fn default_envelope(&self, kind: CallKind) -> Envelope {
        let mut envelope = Envelope::new();
        envelope.insert(MODULE, self.module.as_str());
        envelope.insert(ACTION, self.action.as_str());
        envelope.insert(TIME_STAMP, Value::Null);
        if kind == CallKind::Single {
            envelope.insert(COMMAND_NUM, Value::Null);
        }
        envelope
    }

    /// Builds the envelope for one command from caller arguments.
    ///
    /// Field order is `module`, `action`, `timeStamp`, the required
    /// fields, the supplied optional fields, then `commandNum`. Arguments
    /// not named by the descriptor are ignored.
    ///
    /// # Errors
    /// [`ProtocolError::MissingRequiredField`] naming the first required
    /// field absent from `args`.
    pub fn build(
        &self,
        kind: CallKind,
        args: &Fields,
    ) -> Result<Envelope, ProtocolError> {
        let mut envelope = self.default_envelope(CallKind::Batched);

        for key in &self.requires {
            let value = args
                .get(key)
                .ok_or_else(|| ProtocolError::MissingRequiredField(key.clone()))?;
            envelope.insert(key.as_str(), value.clone());
        }

        for key in &self.options {
            if let Some(value) = args.get(key) {
                envelope.insert(key.as_str(), value.clone());
            }
        }

        if kind == CallKind::Single {
            envelope.insert(COMMAND_NUM, Value::Null);
        }

        for key in &self.excludes {
            envelope.remove(key);
        }

        tracing::trace!(
            module = %self.module,
            action = %self.action,
            fields = envelope.len(),
            "built envelope"
        );
        Ok(envelope)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Codec, CommandTag, JsonCodec};

    fn args(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_build_default_single_has_all_slots() {
        let descriptor = RequestDescriptor::new("user", "userInfo");

        let envelope = descriptor.build(CallKind::Single, &Fields::new()).unwrap();

        let keys: Vec<_> = envelope.fields().keys().cloned().collect();
        assert_eq!(keys, ["module", "action", "timeStamp", "commandNum"]);
        assert_eq!(envelope.target(), Some(("user", "userInfo")));
    }

    #[test]
    fn test_build_batched_has_no_command_slot() {
        let descriptor = RequestDescriptor::new("unit", "deckInfo");

        let envelope =
            descriptor.build(CallKind::Batched, &Fields::new()).unwrap();

        assert!(!envelope.contains(COMMAND_NUM));
        assert!(envelope.contains(TIME_STAMP));
    }

    #[test]
    fn test_build_missing_required_names_the_field() {
        let descriptor = RequestDescriptor::new("m", "a").requires(["a", "b"]);

        let result = descriptor.build(CallKind::Single, &args(json!({ "a": 1 })));

        assert!(
            matches!(result, Err(ProtocolError::MissingRequiredField(ref f)) if f == "b"),
            "got {result:?}"
        );
    }

    #[test]
    fn test_build_copies_required_and_supplied_optional_only() {
        let descriptor = RequestDescriptor::new("secretbox", "pon")
            .requires(["secret_box_id"])
            .options(["cost_priority", "count"]);

        let envelope = descriptor
            .build(
                CallKind::Single,
                &args(json!({
                    "secret_box_id": 61, "cost_priority": 1, "unrelated": true
                })),
            )
            .unwrap();

        assert_eq!(envelope.get("secret_box_id"), Some(&json!(61)));
        assert_eq!(envelope.get("cost_priority"), Some(&json!(1)));
        assert!(!envelope.contains("count"));
        assert!(!envelope.contains("unrelated"));
    }

    #[test]
    fn test_build_places_arguments_before_command_num() {
        let descriptor = RequestDescriptor::new("tos", "tosAgree")
            .requires(["tos_id"])
            .options(["note"]);

        let envelope = descriptor
            .build(CallKind::Single, &args(json!({ "note": "x", "tos_id": 3 })))
            .unwrap();

        let keys: Vec<_> = envelope.fields().keys().cloned().collect();
        assert_eq!(
            keys,
            ["module", "action", "timeStamp", "tos_id", "note", "commandNum"]
        );
    }

    #[test]
    fn test_build_excludes_command_num_from_default_shape() {
        let descriptor =
            RequestDescriptor::new("lbonus", "execute").excludes(["commandNum"]);

        let envelope = descriptor.build(CallKind::Single, &Fields::new()).unwrap();
        let stamped = envelope.stamp(10, Some(&CommandTag {
            login_key: "k".into(),
            number: 2,
        }));

        assert!(!envelope.contains(COMMAND_NUM));
        assert!(!stamped.contains(COMMAND_NUM));
    }

    #[test]
    fn test_build_excludes_all_default_slots() {
        let descriptor = RequestDescriptor::new("login", "login")
            .requires(["login_key", "login_passwd"])
            .excludes(["module", "action", "timeStamp", "commandNum"]);

        let envelope = descriptor
            .build(
                CallKind::Single,
                &args(json!({ "login_key": "k", "login_passwd": "p" })),
            )
            .unwrap();

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "login_key": "k", "login_passwd": "p" })
        );
    }

    #[test]
    fn test_build_encode_decode_preserves_keys_and_values() {
        let descriptor = RequestDescriptor::new("user", "changeName")
            .requires(["name"]);
        let envelope = descriptor
            .build(CallKind::Single, &args(json!({ "name": "幻の学院生" })))
            .unwrap()
            .stamp(1_700_000_000, Some(&CommandTag {
                login_key: "key".into(),
                number: 4,
            }));

        let bytes = JsonCodec.encode(&envelope).unwrap();
        let decoded: Fields = JsonCodec.decode(&bytes).unwrap();

        assert_eq!(&decoded, envelope.fields());
    }

    #[test]
    fn test_uri_formats_main_php_path() {
        let descriptor = RequestDescriptor::new("handover", "start");
        assert_eq!(descriptor.uri(), "/main.php/handover/start");
    }
}
