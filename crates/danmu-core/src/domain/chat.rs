//! Chat events received from the gateway.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A decoded chat event accepted for downstream processing.
///
/// Field names follow the gateway wire format (`roomId`, `type`, `msg`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    /// Source platform reported by the gateway (e.g. `bilibili`).
    pub platform: String,
    /// Room the message was posted in. Numeric ids are kept as their decimal
    /// text.
    #[serde(deserialize_with = "loose_string")]
    pub room_id: String,
    /// Event type tag. Only `DANMU` events leave the decoder.
    #[serde(rename = "type")]
    pub kind: String,
    /// The chat message itself.
    #[serde(rename = "msg")]
    pub message: ChatMessage,
}

/// The user-visible part of a chat event.
///
/// Badge and avatar keys must be present but may hold `null` (viewers
/// without a fan badge) or an unexpected type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub username: String,
    pub content: String,
    #[serde(deserialize_with = "loose_string")]
    pub badge_name: String,
    #[serde(deserialize_with = "loose_level")]
    pub badge_level: i64,
    #[serde(rename = "userAvatar", deserialize_with = "loose_string")]
    pub avatar_url: String,
}

/// Strings pass through, `null` becomes empty, anything else its JSON text.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Integers and numeric strings are kept; everything else reads as level 0.
fn loose_level<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

impl ChatEvent {
    /// Text handed to the speech queue for this event.
    pub fn speech_text(&self) -> &str {
        self.message.content.trim()
    }

    /// One display line in `nick: content` form.
    pub fn display_line(&self) -> String {
        format!("{}: {}", self.message.username, self.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChatEvent {
        ChatEvent {
            platform: "bilibili".to_string(),
            room_id: "42".to_string(),
            kind: "DANMU".to_string(),
            message: ChatMessage {
                username: "alice".to_string(),
                content: "  hello there ".to_string(),
                badge_name: "fan".to_string(),
                badge_level: 3,
                avatar_url: "https://example.invalid/a.png".to_string(),
            },
        }
    }

    #[test]
    fn test_speech_text_is_trimmed_content() {
        assert_eq!(sample().speech_text(), "hello there");
    }

    #[test]
    fn test_display_line() {
        assert_eq!(sample().display_line(), "alice:   hello there ");
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["roomId"], "42");
        assert_eq!(json["type"], "DANMU");
        assert_eq!(json["msg"]["badgeLevel"], 3);
        assert_eq!(json["msg"]["userAvatar"], "https://example.invalid/a.png");
    }
}
