//! Message contract shared by the host and every fragment.
//!
//! Two message kinds exist. A `BULB_SET_REQUEST` asks the mediator to switch
//! a set of bulbs; a `BULB_STATE_CHANGED` reports what was actually switched.
//! Both serialize to the JSON shape fragments exchange:
//!
//! ```json
//! { "type": "BULB_SET_REQUEST", "version": "1.0.0", "source": "mfe1",
//!   "targets": ["host", "mfe1"], "payload": { "state": true },
//!   "correlationId": "corr-1700000000000-k3j9x0a" }
//! ```

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::MessageError;
use crate::participant::ParticipantId;

/// Contract version stamped on every message this crate creates
pub const CONTRACT_VERSION: &str = "1.0.0";

/// Whether a peer's contract version can be understood by this build
///
/// Versions are compatible when their major components match.
pub fn is_compatible_version(version: &str) -> bool {
    fn major(v: &str) -> Option<&str> {
        v.split('.').next().filter(|m| !m.is_empty())
    }
    match (major(version), major(CONTRACT_VERSION)) {
        (Some(theirs), Some(ours)) => theirs == ours,
        _ => false,
    }
}

/// Message kind used for routing on the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// A request to switch bulbs
    #[serde(rename = "BULB_SET_REQUEST")]
    BulbSetRequest,
    /// A broadcast of applied bulb state
    #[serde(rename = "BULB_STATE_CHANGED")]
    BulbStateChanged,
}

impl MessageKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::BulbSetRequest => "BULB_SET_REQUEST",
            MessageKind::BulbStateChanged => "BULB_STATE_CHANGED",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(MessageError::EmptyType),
            "BULB_SET_REQUEST" => Ok(MessageKind::BulbSetRequest),
            "BULB_STATE_CHANGED" => Ok(MessageKind::BulbStateChanged),
            other => Err(MessageError::UnknownType {
                name: other.to_string(),
            }),
        }
    }
}

/// Identifier linking a request to the broadcast it caused
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    /// Generate a fresh id of the form `corr-<unix millis>-<7 chars>`
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "corr-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..7]
        ))
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

fn default_version() -> String {
    CONTRACT_VERSION.to_string()
}

/// Body of a set request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BulbPayload {
    /// Desired bulb state
    pub state: bool,
}

// Anything that is not literally `{"state": true}` decodes as off.
impl<'de> Deserialize<'de> for BulbPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self {
            state: value
                .get("state")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false),
        })
    }
}

/// `BULB_SET_REQUEST`: ask the mediator to switch `targets` to `payload.state`
///
/// `targets` is not validated by the sender; it may repeat ids or name
/// participants that do not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulbSetRequest {
    #[serde(default = "default_version")]
    pub version: String,
    pub source: ParticipantId,
    #[serde(default)]
    pub targets: Vec<ParticipantId>,
    #[serde(default)]
    pub payload: BulbPayload,
    #[serde(default)]
    pub correlation_id: CorrelationId,
}

impl BulbSetRequest {
    /// Build a request with the current contract version and a fresh correlation id
    pub fn new(source: impl Into<ParticipantId>, targets: Vec<ParticipantId>, state: bool) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            source: source.into(),
            targets,
            payload: BulbPayload { state },
            correlation_id: CorrelationId::generate(),
        }
    }

    /// Replace the generated correlation id
    pub fn with_correlation_id(mut self, id: impl Into<CorrelationId>) -> Self {
        self.correlation_id = id.into();
        self
    }

    /// Override the contract version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// `BULB_STATE_CHANGED`: the bulbs in `targets` are now `state`
///
/// `targets` only ever holds registered ids, each at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulbStateChanged {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub targets: Vec<ParticipantId>,
    #[serde(default)]
    pub state: bool,
    #[serde(default)]
    pub correlation_id: CorrelationId,
}

impl BulbStateChanged {
    /// Whether `id` is one of the switched participants
    pub fn includes(&self, id: &ParticipantId) -> bool {
        self.targets.contains(id)
    }
}

/// Any message that can travel over the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Request to switch bulbs
    #[serde(rename = "BULB_SET_REQUEST")]
    BulbSetRequest(BulbSetRequest),
    /// Broadcast of applied state
    #[serde(rename = "BULB_STATE_CHANGED")]
    BulbStateChanged(BulbStateChanged),
}

impl Message {
    /// Routing kind of this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::BulbSetRequest(_) => MessageKind::BulbSetRequest,
            Message::BulbStateChanged(_) => MessageKind::BulbStateChanged,
        }
    }

    pub fn version(&self) -> &str {
        match self {
            Message::BulbSetRequest(m) => &m.version,
            Message::BulbStateChanged(m) => &m.version,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            Message::BulbSetRequest(m) => &m.correlation_id,
            Message::BulbStateChanged(m) => &m.correlation_id,
        }
    }

    /// Get a short description of this message for logging
    pub fn description(&self) -> String {
        match self {
            Message::BulbSetRequest(m) => format!(
                "{} from {} -> {} targets, state {}",
                MessageKind::BulbSetRequest,
                m.source,
                m.targets.len(),
                if m.payload.state { "on" } else { "off" }
            ),
            Message::BulbStateChanged(m) => format!(
                "{} [{}] state {}",
                MessageKind::BulbStateChanged,
                m.targets
                    .iter()
                    .map(ParticipantId::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                if m.state { "on" } else { "off" }
            ),
        }
    }

    /// Decode a message from its JSON wire form
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode a message to its JSON wire form
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<BulbSetRequest> for Message {
    fn from(request: BulbSetRequest) -> Self {
        Message::BulbSetRequest(request)
    }
}

impl From<BulbStateChanged> for Message {
    fn from(changed: BulbStateChanged) -> Self {
        Message::BulbStateChanged(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::participant_ids;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            "BULB_SET_REQUEST".parse::<MessageKind>().unwrap(),
            MessageKind::BulbSetRequest
        );
        assert!(matches!(
            "".parse::<MessageKind>(),
            Err(MessageError::EmptyType)
        ));
        assert!(matches!(
            "TARGETS_SET_REQUEST".parse::<MessageKind>(),
            Err(MessageError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_request_wire_shape() {
        let msg: Message = BulbSetRequest::new("mfe1", participant_ids(["host", "mfe1"]), true)
            .with_correlation_id("c1")
            .into();
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "BULB_SET_REQUEST",
                "version": "1.0.0",
                "source": "mfe1",
                "targets": ["host", "mfe1"],
                "payload": { "state": true },
                "correlationId": "c1"
            })
        );
    }

    #[test]
    fn test_broadcast_decodes_from_wire() {
        let msg = Message::from_json(
            r#"{"type":"BULB_STATE_CHANGED","version":"1.0.0","targets":["host"],"state":true,"correlationId":"c9"}"#,
        )
        .unwrap();
        match msg {
            Message::BulbStateChanged(changed) => {
                assert!(changed.includes(&"host".into()));
                assert!(changed.state);
                assert_eq!(changed.correlation_id.as_str(), "c9");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_malformed_payload_coerces_to_off() {
        let cases = [
            r#"{"type":"BULB_SET_REQUEST","source":"host","targets":["host"]}"#,
            r#"{"type":"BULB_SET_REQUEST","source":"host","targets":["host"],"payload":{}}"#,
            r#"{"type":"BULB_SET_REQUEST","source":"host","targets":["host"],"payload":null}"#,
            r#"{"type":"BULB_SET_REQUEST","source":"host","targets":["host"],"payload":{"state":"yes"}}"#,
            r#"{"type":"BULB_SET_REQUEST","source":"host","targets":["host"],"payload":{"state":1}}"#,
        ];
        for case in cases {
            match Message::from_json(case).unwrap() {
                Message::BulbSetRequest(req) => assert!(!req.payload.state, "{}", case),
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Message::from_json(r#"{"type":"TARGETS_CHANGED","targets":[]}"#);
        assert!(matches!(err, Err(MessageError::Json(_))));
    }

    #[test]
    fn test_correlation_id_shape() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("corr-"));
        assert_eq!(a.as_str().rsplit('-').next().map(str::len), Some(7));
    }

    #[test]
    fn test_version_compatibility() {
        assert!(is_compatible_version("1.0.0"));
        assert!(is_compatible_version("1.4.2"));
        assert!(!is_compatible_version("2.0.0"));
        assert!(!is_compatible_version(""));
    }
}
