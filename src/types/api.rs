use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier the conversation service assigns to a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub i64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::Other => "system",
        }
    }
}

/// A stored message as returned by the message history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One record of the newline-delimited chat response body.
///
/// Fields beyond the ones modelled here are ignored, so `tool_end` records that
/// carry the service's `tool`/`result` payload still close the open tool block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Content {
        #[serde(default, deserialize_with = "lenient_text")]
        data: String,
    },
    ToolStart {
        #[serde(deserialize_with = "lenient_text")]
        tool: String,
        #[serde(default)]
        args: Value,
    },
    ToolEnd,
    Error {
        #[serde(default, deserialize_with = "lenient_text")]
        content: String,
    },
    #[serde(other)]
    Unknown,
}

/// Text slot that accepts any JSON value: strings as-is, null as empty, and
/// anything else as its compact JSON form.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub conversation_id: ConversationId,
    pub message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateConversationRequest<'a> {
    pub title: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_ignores_extra_server_columns() {
        let raw = json!({
            "id": 7,
            "conversation_id": 3,
            "role": "assistant",
            "content": "done",
            "created_at": "2025-01-01 10:00:00"
        });
        let message: Message = serde_json::from_value(raw).expect("message should parse");
        assert_eq!(message, Message::new(Role::Assistant, "done"));
    }

    #[test]
    fn test_unknown_role_maps_to_other() {
        let message: Message =
            serde_json::from_value(json!({"role": "tool", "content": "42"})).expect("parse");
        assert_eq!(message.role, Role::Other);
    }

    #[test]
    fn test_chat_request_wire_shape() {
        let body = serde_json::to_value(ChatRequest {
            conversation_id: ConversationId(12),
            message: "hi",
        })
        .expect("serialize");
        assert_eq!(body, json!({"conversation_id": 12, "message": "hi"}));
    }

    #[test]
    fn test_tool_end_ignores_service_payload() {
        for raw in [
            json!({"type": "tool_end", "tool": "get_weather", "result": "sunny"}),
            json!({"type": "tool_end", "tool": 7, "result": {"ok": true}}),
            json!({"type": "tool_end"}),
        ] {
            let event: StreamEvent = serde_json::from_value(raw).expect("tool_end should parse");
            assert_eq!(event, StreamEvent::ToolEnd);
        }
    }

    #[test]
    fn test_text_fields_accept_non_string_values() {
        let event: StreamEvent =
            serde_json::from_value(json!({"type": "content", "data": 42})).expect("parse");
        assert_eq!(
            event,
            StreamEvent::Content {
                data: "42".to_string()
            }
        );

        let event: StreamEvent = serde_json::from_value(json!({"type": "error"})).expect("parse");
        assert_eq!(
            event,
            StreamEvent::Error {
                content: String::new()
            }
        );

        let event: StreamEvent =
            serde_json::from_value(json!({"type": "error", "content": null})).expect("parse");
        assert_eq!(
            event,
            StreamEvent::Error {
                content: String::new()
            }
        );
    }
}
