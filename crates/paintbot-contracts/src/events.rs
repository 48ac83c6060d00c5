use serde_json::{json, Value};

/// A validated inbound event, as handed over by the webhook gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text(TextEvent),
    Postback(PostbackEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub reply_token: String,
    pub user_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostbackEvent {
    pub reply_token: Option<String>,
    pub user_id: String,
    pub data: String,
}

impl InboundEvent {
    pub fn text(reply_token: impl Into<String>, text: impl Into<String>) -> Self {
        InboundEvent::Text(TextEvent {
            reply_token: reply_token.into(),
            user_id: None,
            text: text.into(),
        })
    }

    pub fn postback(user_id: impl Into<String>, data: impl Into<String>) -> Self {
        InboundEvent::Postback(PostbackEvent {
            reply_token: None,
            user_id: user_id.into(),
            data: data.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Text(_) => "text",
            InboundEvent::Postback(_) => "postback",
        }
    }
}

/// Extracts the events this bot acts on from a webhook body.
///
/// Non-text messages, follows, joins and the like are skipped, as are events
/// missing the fields needed to act on them.
pub fn parse_webhook_body(body: &Value) -> Vec<InboundEvent> {
    let Some(events) = body.get("events").and_then(Value::as_array) else {
        return Vec::new();
    };
    events.iter().filter_map(parse_webhook_event).collect()
}

fn parse_webhook_event(event: &Value) -> Option<InboundEvent> {
    let reply_token = string_at(event, &["replyToken"]);
    let user_id = string_at(event, &["source", "userId"]);
    match event.get("type").and_then(Value::as_str)? {
        "message" => {
            if event.pointer("/message/type").and_then(Value::as_str) != Some("text") {
                return None;
            }
            Some(InboundEvent::Text(TextEvent {
                reply_token: reply_token?,
                user_id,
                text: string_at(event, &["message", "text"]).unwrap_or_default(),
            }))
        }
        "postback" => Some(InboundEvent::Postback(PostbackEvent {
            reply_token,
            user_id: user_id?,
            data: string_at(event, &["postback", "data"]).unwrap_or_default(),
        })),
        _ => None,
    }
}

fn string_at(value: &Value, path: &[&str]) -> Option<String> {
    path.iter()
        .try_fold(value, |node, key| node.get(*key))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn text_message(text: &str) -> Value {
    json!({
        "type": "text",
        "text": text,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_webhook_body, text_message, InboundEvent, PostbackEvent, TextEvent};

    #[test]
    fn parses_text_and_postback_events_in_order() {
        let body = json!({
            "destination": "Uxxx",
            "events": [
                {
                    "type": "message",
                    "replyToken": "token-1",
                    "source": {"type": "user", "userId": "U1"},
                    "message": {"type": "text", "id": "1", "text": "油漆色號"}
                },
                {
                    "type": "postback",
                    "replyToken": "token-2",
                    "source": {"type": "user", "userId": "U2"},
                    "postback": {"data": "goto=richmenu2"}
                }
            ]
        });
        assert_eq!(
            parse_webhook_body(&body),
            vec![
                InboundEvent::Text(TextEvent {
                    reply_token: "token-1".to_string(),
                    user_id: Some("U1".to_string()),
                    text: "油漆色號".to_string(),
                }),
                InboundEvent::Postback(PostbackEvent {
                    reply_token: Some("token-2".to_string()),
                    user_id: "U2".to_string(),
                    data: "goto=richmenu2".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn skips_unsupported_and_incomplete_events() {
        let body = json!({
            "events": [
                {"type": "follow", "replyToken": "t", "source": {"userId": "U1"}},
                {"type": "message", "replyToken": "t", "message": {"type": "sticker"}},
                {"type": "message", "message": {"type": "text", "text": "no token"}},
                {"type": "postback", "replyToken": "t", "postback": {"data": "goto=x"}}
            ]
        });
        assert!(parse_webhook_body(&body).is_empty());
        assert!(parse_webhook_body(&json!({})).is_empty());
    }

    #[test]
    fn text_message_shape() {
        assert_eq!(text_message("hi"), json!({"type": "text", "text": "hi"}));
        assert_eq!(InboundEvent::text("t", "hi").kind(), "text");
        assert_eq!(InboundEvent::postback("U", "goto=a").kind(), "postback");
    }
}
