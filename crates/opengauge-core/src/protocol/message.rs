//! Wire messages
//!
//! Every message is one JSON object `{ "type": ..., "payload": ... }`. The
//! `type` tag is decoded first; a tag this side does not know, or a payload
//! that does not fit its tag, decodes to [`ProtocolMessage::Unknown`] so a
//! newer peer never breaks the stream.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::var::VarKey;

/// Message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Client subscribes; server acknowledges
    Init,
    /// Server asks the client to initialize again (vehicle changed)
    ReInit,
    /// One sample
    Var,
    /// Named event
    Event,
    /// Anything else
    #[serde(other)]
    Unknown,
}

/// A var a client wants to receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarDef {
    /// Var name
    pub name: String,
    /// Unit the value should be reported in
    pub unit: String,
    /// Ask the server to log this var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl VarDef {
    /// Subscription to a key
    pub fn new(key: &VarKey) -> Self {
        Self {
            name: key.name.clone(),
            unit: key.unit.clone(),
            debug: None,
        }
    }

    /// The key this definition refers to
    pub fn key(&self) -> VarKey {
        VarKey::new(&self.name, &self.unit)
    }

    /// Whether the server should log this var
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }
}

impl From<VarKey> for VarDef {
    fn from(key: VarKey) -> Self {
        VarDef::new(&key)
    }
}

/// Payload of `init` and `reInit`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    /// Vehicle the client's gauges are for, or the server's current vehicle
    #[serde(default)]
    pub vehicle_name: Option<String>,
    /// Subscribed vars
    #[serde(default)]
    pub vars: Vec<VarDef>,
    /// Subscribed events
    #[serde(default)]
    pub events: Vec<String>,
}

impl InitPayload {
    /// Server reply carrying only the current vehicle
    pub fn vehicle(vehicle_name: Option<String>) -> Self {
        Self {
            vehicle_name,
            ..Default::default()
        }
    }
}

/// Payload of `var`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarPayload {
    /// Var name
    pub name: String,
    /// Var unit
    pub unit: String,
    /// Sample value; `null` when the source has none
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: Option<f64>,
}

impl VarPayload {
    /// Create a var payload
    pub fn new(key: &VarKey, value: Option<f64>) -> Self {
        Self {
            name: key.name.clone(),
            unit: key.unit.clone(),
            value,
        }
    }

    /// The key this sample belongs to
    pub fn key(&self) -> VarKey {
        VarKey::new(&self.name, &self.unit)
    }
}

/// Numbers and numeric strings become values, anything else is absent
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Payload of `event`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event name
    pub name: String,
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Envelope", into = "Envelope")]
pub enum ProtocolMessage {
    /// Subscription request or acknowledgement
    Init(InitPayload),
    /// Request to initialize again
    ReInit(InitPayload),
    /// One sample
    Var(VarPayload),
    /// Named event
    Event(EventPayload),
    /// Unrecognised type or payload, kept raw
    Unknown(Value),
}

impl ProtocolMessage {
    /// Kind of this message
    pub fn message_type(&self) -> MessageType {
        match self {
            ProtocolMessage::Init(_) => MessageType::Init,
            ProtocolMessage::ReInit(_) => MessageType::ReInit,
            ProtocolMessage::Var(_) => MessageType::Var,
            ProtocolMessage::Event(_) => MessageType::Event,
            ProtocolMessage::Unknown(_) => MessageType::Unknown,
        }
    }
}

/// Outer shape of every message on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    message_type: MessageType,
    #[serde(default)]
    payload: Value,
}

impl From<Envelope> for ProtocolMessage {
    fn from(envelope: Envelope) -> Self {
        let payload = envelope.payload;

        let message = match envelope.message_type {
            MessageType::Init => serde_json::from_value(payload.clone()).map(ProtocolMessage::Init),
            MessageType::ReInit => {
                serde_json::from_value(payload.clone()).map(ProtocolMessage::ReInit)
            }
            MessageType::Var => serde_json::from_value(payload.clone()).map(ProtocolMessage::Var),
            MessageType::Event => {
                serde_json::from_value(payload.clone()).map(ProtocolMessage::Event)
            }
            MessageType::Unknown => return ProtocolMessage::Unknown(payload),
        };

        message.unwrap_or_else(|e| {
            tracing::debug!("Payload does not match its type: {}", e);
            ProtocolMessage::Unknown(payload)
        })
    }
}

impl From<ProtocolMessage> for Envelope {
    fn from(message: ProtocolMessage) -> Self {
        let message_type = message.message_type();
        let payload = match message {
            ProtocolMessage::Init(p) | ProtocolMessage::ReInit(p) => serde_json::to_value(p),
            ProtocolMessage::Var(p) => serde_json::to_value(p),
            ProtocolMessage::Event(p) => serde_json::to_value(p),
            ProtocolMessage::Unknown(v) => Ok(v),
        };

        Envelope {
            message_type,
            payload: payload.unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_var_null_value() {
        let msg: ProtocolMessage = serde_json::from_str(
            r#"{"type":"var","payload":{"name":"AIRSPEED INDICATED","unit":"knots","value":null}}"#,
        )
        .unwrap();

        assert_eq!(
            msg,
            ProtocolMessage::Var(VarPayload {
                name: "AIRSPEED INDICATED".to_string(),
                unit: "knots".to_string(),
                value: None,
            })
        );
    }

    #[test]
    fn test_numeric_string_value() {
        let payload: VarPayload =
            serde_json::from_str(r#"{"name":"X","unit":"feet","value":"12.5"}"#).unwrap();
        assert_eq!(payload.value, Some(12.5));

        let payload: VarPayload =
            serde_json::from_str(r#"{"name":"X","unit":"feet","value":"n/a"}"#).unwrap();
        assert_eq!(payload.value, None);
    }

    #[test]
    fn test_unknown_type() {
        let msg: ProtocolMessage =
            serde_json::from_str(r#"{"type":"telemetryV2","payload":{"a":1}}"#).unwrap();
        assert_eq!(msg.message_type(), MessageType::Unknown);
    }

    #[test]
    fn test_mismatched_payload_is_unknown() {
        let msg: ProtocolMessage = serde_json::from_str(r#"{"type":"event","payload":42}"#).unwrap();
        assert_eq!(msg, ProtocolMessage::Unknown(serde_json::json!(42)));
    }

    #[test]
    fn test_init_wire_shape() {
        let msg = ProtocolMessage::Init(InitPayload {
            vehicle_name: Some("Cessna 172".to_string()),
            vars: vec![VarDef::new(&VarKey::new("PLANE PITCH DEGREES", "degrees"))],
            events: vec![],
        });

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "init",
                "payload": {
                    "vehicleName": "Cessna 172",
                    "vars": [{"name": "PLANE PITCH DEGREES", "unit": "degrees"}],
                    "events": []
                }
            })
        );
    }
}
