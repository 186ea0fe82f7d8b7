// ── Frame codec ──
//
// Turns inbound text frames from the gateway into typed events.
// Frames are JSON objects discriminated by `type`:
//
//   {"type": "ping"}
//   {"type": "sensor", "tipo": "Vazamento de Gás"}
//   {"type": "botao",  "status": "Apertado"}
//   {"type": "queda",  "status": "Queda Detectada"}

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::DeviceChannel;

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorEvent {
    /// Keep-alive from the gateway.
    Ping,
    SensorUpdate { state: String },
    ButtonUpdate { state: String },
    FallUpdate { state: String },
    /// Well-formed frame with a `type` this client does not know.
    Unknown { kind: String },
}

impl SensorEvent {
    /// The channel this event updates, if any.
    pub fn channel(&self) -> Option<(DeviceChannel, &str)> {
        match self {
            Self::SensorUpdate { state } => Some((DeviceChannel::Environment, state)),
            Self::ButtonUpdate { state } => Some((DeviceChannel::Button, state)),
            Self::FallUpdate { state } => Some((DeviceChannel::Fall, state)),
            Self::Ping | Self::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no string `type` field")]
    MissingType,

    #[error("`{kind}` frame has no `{field}` value")]
    MissingValue { kind: &'static str, field: &'static str },
}

/// Decode one raw frame.
pub fn decode(raw: impl AsRef<[u8]>) -> Result<SensorEvent, DecodeError> {
    let value: Value = serde_json::from_slice(raw.as_ref())?;
    let Value::Object(frame) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let kind = frame
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    match kind {
        "ping" => Ok(SensorEvent::Ping),
        "sensor" => Ok(SensorEvent::SensorUpdate {
            state: channel_value(&frame, "sensor", "tipo", "status")?,
        }),
        "botao" => Ok(SensorEvent::ButtonUpdate {
            state: channel_value(&frame, "botao", "status", "tipo")?,
        }),
        "queda" => Ok(SensorEvent::FallUpdate {
            state: channel_value(&frame, "queda", "status", "tipo")?,
        }),
        other => Ok(SensorEvent::Unknown {
            kind: other.to_owned(),
        }),
    }
}

/// First non-empty string among `primary` and `fallback`.
fn channel_value(
    frame: &Map<String, Value>,
    kind: &'static str,
    primary: &'static str,
    fallback: &'static str,
) -> Result<String, DecodeError> {
    [primary, fallback]
        .into_iter()
        .filter_map(|field| frame.get(field).and_then(Value::as_str))
        .find(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(DecodeError::MissingValue {
            kind,
            field: primary,
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ping() {
        assert_eq!(decode(r#"{"type":"ping"}"#).unwrap(), SensorEvent::Ping);
    }

    #[test]
    fn sensor_reads_tipo() {
        let event = decode(r#"{"type":"sensor","tipo":"Fumaça Detectada"}"#).unwrap();
        assert_eq!(
            event,
            SensorEvent::SensorUpdate {
                state: "Fumaça Detectada".into()
            }
        );
        assert_eq!(
            event.channel(),
            Some((DeviceChannel::Environment, "Fumaça Detectada"))
        );
    }

    #[test]
    fn button_and_fall_read_status() {
        assert_eq!(
            decode(r#"{"type":"botao","status":"Apertado"}"#).unwrap(),
            SensorEvent::ButtonUpdate {
                state: "Apertado".into()
            }
        );
        assert_eq!(
            decode(br#"{"type":"queda","status":"Normal","ts":17}"#).unwrap(),
            SensorEvent::FallUpdate {
                state: "Normal".into()
            }
        );
    }

    #[test]
    fn value_field_falls_back() {
        assert_eq!(
            decode(r#"{"type":"sensor","status":"Seguro"}"#).unwrap(),
            SensorEvent::SensorUpdate {
                state: "Seguro".into()
            }
        );
        assert_eq!(
            decode(r#"{"type":"botao","status":"","tipo":"Normal"}"#).unwrap(),
            SensorEvent::ButtonUpdate {
                state: "Normal".into()
            }
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        assert_eq!(
            decode(r#"{"type":"wifi","rssi":-60}"#).unwrap(),
            SensorEvent::Unknown {
                kind: "wifi".into()
            }
        );
    }

    #[test]
    fn malformed_frames_are_rejected() {
        assert!(matches!(decode("not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(
            decode(r#"{"tipo":"Seguro"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            decode(r#"{"type":7}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            decode(r#"{"type":"queda"}"#),
            Err(DecodeError::MissingValue {
                kind: "queda",
                field: "status"
            })
        ));
        assert!(matches!(
            decode(r#"{"type":"sensor","tipo":42}"#),
            Err(DecodeError::MissingValue { .. })
        ));
    }
}
