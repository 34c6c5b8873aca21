//! Custom-namespace message protocol.
//!
//! The receiver application reports progress and end-of-content over an
//! application-defined namespace using small JSON objects:
//! - `{"progress": <seconds>, "duration": <seconds>}`
//! - `{"type": "finish"}`
//!
//! Anything else is logged and dropped.

use log::{debug, warn};
use serde_json::Value;

/// Decoded custom-namespace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    Progress { position_ms: u64, duration_ms: u64 },
    Finish,
}

/// Parses one message body.
///
/// Returns `Ok(None)` for well-formed JSON of an unrecognized shape and `Err`
/// when the body cannot be decoded at all.
pub fn parse_channel_message(payload: &str) -> Result<Option<ChannelMessage>, String> {
    let value: Value =
        serde_json::from_str(payload).map_err(|err| format!("invalid message json: {err}"))?;
    let Some(object) = value.as_object() else {
        return Err("message body is not a json object".to_string());
    };

    if let (Some(progress), Some(duration)) = (object.get("progress"), object.get("duration")) {
        let position_ms = seconds_to_ms(progress)
            .ok_or_else(|| format!("invalid progress value: {progress}"))?;
        let duration_ms = seconds_to_ms(duration)
            .ok_or_else(|| format!("invalid duration value: {duration}"))?;
        return Ok(Some(ChannelMessage::Progress {
            position_ms,
            duration_ms,
        }));
    }

    if let Some(kind) = object.get("type") {
        let kind = kind
            .as_str()
            .ok_or_else(|| format!("invalid type value: {kind}"))?;
        if kind.eq_ignore_ascii_case("finish") {
            return Ok(Some(ChannelMessage::Finish));
        }
    }
    Ok(None)
}

/// Accepts numbers and numeric strings, like the receiver's own encoder emits.
fn seconds_to_ms(value: &Value) -> Option<u64> {
    let seconds = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !seconds.is_finite() {
        return None;
    }
    Some((seconds.max(0.0) * 1000.0) as u64)
}

/// Decoder bound to a single namespace.
#[derive(Debug, Clone)]
pub struct MessageChannel {
    namespace: String,
}

impl MessageChannel {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Decodes a message received on `namespace`, dropping anything that is
    /// off-namespace, malformed or unrecognized.
    pub fn decode(&self, namespace: &str, payload: &str) -> Option<ChannelMessage> {
        if namespace != self.namespace {
            debug!(
                "MessageChannel: ignoring message on foreign namespace {}",
                namespace
            );
            return None;
        }
        match parse_channel_message(payload) {
            Ok(Some(message)) => Some(message),
            Ok(None) => {
                debug!("MessageChannel: unrecognized message dropped: {}", payload);
                None
            }
            Err(err) => {
                warn!("MessageChannel: failed to decode message: {}", err);
                None
            }
        }
    }

    /// Body asking the receiver to switch subtitles to `language`.
    pub fn encode_subtitle_request(language: &str) -> String {
        serde_json::json!({"type": "subtitle", "language": language}).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_channel_message, ChannelMessage, MessageChannel};

    const NAMESPACE: &str = "urn:x-cast:com.example.test";

    #[test]
    fn test_progress_message_converts_seconds_to_ms() {
        let message = parse_channel_message(r#"{"progress":12.5,"duration":100.0}"#);
        assert_eq!(
            message,
            Ok(Some(ChannelMessage::Progress {
                position_ms: 12_500,
                duration_ms: 100_000,
            }))
        );
    }

    #[test]
    fn test_progress_is_checked_before_type() {
        let message = parse_channel_message(r#"{"type":"finish","progress":1,"duration":2}"#);
        assert_eq!(
            message,
            Ok(Some(ChannelMessage::Progress {
                position_ms: 1_000,
                duration_ms: 2_000,
            }))
        );
    }

    #[test]
    fn test_finish_type_is_case_insensitive() {
        assert_eq!(
            parse_channel_message(r#"{"type":"FiNiSh","extra":true}"#),
            Ok(Some(ChannelMessage::Finish))
        );
    }

    #[test]
    fn test_unknown_shapes_are_not_errors() {
        assert_eq!(parse_channel_message(r#"{"type":"pause"}"#), Ok(None));
        assert_eq!(parse_channel_message(r#"{"progress":3}"#), Ok(None));
    }

    #[test]
    fn test_malformed_bodies_are_errors() {
        assert!(parse_channel_message("{not json").is_err());
        assert!(parse_channel_message("[1,2]").is_err());
        assert!(parse_channel_message(r#"{"progress":"abc","duration":1}"#).is_err());
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        assert_eq!(
            parse_channel_message(r#"{"progress":"2.25","duration":"10"}"#),
            Ok(Some(ChannelMessage::Progress {
                position_ms: 2_250,
                duration_ms: 10_000,
            }))
        );
    }

    #[test]
    fn test_decode_drops_foreign_namespace_and_garbage() {
        let channel = MessageChannel::new(NAMESPACE);
        assert_eq!(
            channel.decode("urn:x-cast:other", r#"{"type":"finish"}"#),
            None
        );
        assert_eq!(channel.decode(NAMESPACE, "garbage"), None);
        assert_eq!(
            channel.decode(NAMESPACE, r#"{"type":"finish"}"#),
            Some(ChannelMessage::Finish)
        );
    }

    #[test]
    fn test_subtitle_request_round_trips_through_json() {
        let body = MessageChannel::encode_subtitle_request("pt-BR");
        let value: serde_json::Value = serde_json::from_str(&body).expect("valid json");
        assert_eq!(value["type"], "subtitle");
        assert_eq!(value["language"], "pt-BR");
    }
}
