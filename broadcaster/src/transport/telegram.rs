//! Telegram Bot API transport.
//!
//! Each payload kind maps to one Bot API method:
//!
//! | Payload    | Method         | `protect_content` |
//! |------------|----------------|-------------------|
//! | photo      | `sendPhoto`    | no                |
//! | video      | `sendVideo`    | yes               |
//! | document   | `sendDocument` | yes               |
//! | audio      | `sendAudio`    | no                |
//! | voice      | `sendVoice`    | no                |
//! | text       | `sendMessage`  | no                |
//!
//! Captions and text are sent with `parse_mode=HTML`; action buttons become an
//! inline keyboard.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::{Ack, Transport, TransportError};
use crate::campaign::{ActionButton, Payload, PayloadKind, RecipientId};

/// Wait assumed when the API says 429 without a `retry_after` hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// [`Transport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    client: Client,
    api_url: String,
    token: String,
    timeout: Duration,
}

impl TelegramTransport {
    pub fn new(client: Client, api_url: &str, token: &str, timeout: Duration) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }
}

fn method_for(kind: PayloadKind) -> &'static str {
    match kind {
        PayloadKind::Photo => "sendPhoto",
        PayloadKind::Video => "sendVideo",
        PayloadKind::Document => "sendDocument",
        PayloadKind::Audio => "sendAudio",
        PayloadKind::Voice => "sendVoice",
        PayloadKind::Text => "sendMessage",
    }
}

/// Build the JSON body of a send request.
fn request_body(recipient: RecipientId, payload: &Payload, buttons: &[Vec<ActionButton>]) -> Value {
    let mut body = Map::new();
    body.insert("chat_id".to_string(), json!(recipient));
    body.insert("parse_mode".to_string(), json!("HTML"));

    match payload {
        Payload::Text { text } => {
            body.insert("text".to_string(), json!(text));
        }
        Payload::Photo(media)
        | Payload::Video(media)
        | Payload::Document(media)
        | Payload::Audio(media)
        | Payload::Voice(media) => {
            body.insert(payload.kind().as_str().to_string(), json!(media.file_id));
            body.insert("caption".to_string(), json!(media.caption));
        }
    }

    if matches!(payload.kind(), PayloadKind::Video | PayloadKind::Document) {
        body.insert("protect_content".to_string(), json!(true));
    }

    if !buttons.is_empty() {
        let keyboard: Vec<Vec<Value>> = buttons
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| json!({ "text": b.text, "url": b.url }))
                    .collect()
            })
            .collect();
        body.insert(
            "reply_markup".to_string(),
            json!({ "inline_keyboard": keyboard }),
        );
    }

    Value::Object(body)
}

/// Map an HTTP status and decoded envelope to a send result.
fn interpret(status: u16, response: ApiResponse) -> Result<Ack, TransportError> {
    if (200..300).contains(&status) && response.ok {
        return Ok(Ack {
            message_id: response.result.map(|m| m.message_id),
        });
    }

    let retry_after = response.parameters.and_then(|p| p.retry_after);
    let description = response
        .description
        .unwrap_or_else(|| format!("HTTP {status}"));

    match (status, retry_after) {
        (_, Some(secs)) => Err(TransportError::RateLimited(secs)),
        (429, None) => Err(TransportError::RateLimited(DEFAULT_RETRY_AFTER_SECS)),
        (400 | 403, _) => Err(TransportError::PermanentReject),
        (500..=599, _) => Err(TransportError::Transient),
        _ => Err(TransportError::Unknown(description)),
    }
}

/// Map a request-level failure (no usable response) to a transport error.
fn classify_request_error(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        TransportError::Transient
    } else if error.is_builder() {
        TransportError::Internal(error.to_string())
    } else {
        TransportError::Unknown(error.to_string())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(
        &self,
        recipient: RecipientId,
        payload: &Payload,
        buttons: &[Vec<ActionButton>],
    ) -> Result<Ack, TransportError> {
        let method = method_for(payload.kind());
        let body = request_body(recipient, payload, buttons);

        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = resp.status().as_u16();
        let response: ApiResponse = match resp.json().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || status >= 500 => return Err(TransportError::Transient),
            Err(e) => return Err(TransportError::Internal(format!("undecodable reply: {e}"))),
        };

        debug!(
            recipient = recipient,
            method = method,
            status_code = status,
            ok = response.ok,
            "telegram_send_complete"
        );

        interpret(status, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::Media;

    fn response(json: &str) -> ApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_method_for_each_kind() {
        assert_eq!(method_for(PayloadKind::Photo), "sendPhoto");
        assert_eq!(method_for(PayloadKind::Voice), "sendVoice");
        assert_eq!(method_for(PayloadKind::Text), "sendMessage");
    }

    #[test]
    fn test_video_body_is_protected_with_keyboard() {
        let payload = Payload::Video(Media {
            file_id: "BAAC".to_string(),
            caption: "<b>Part 1</b>".to_string(),
        });
        let buttons = vec![vec![
            ActionButton::new("Watch", "https://t.me/a"),
            ActionButton::new("More", "https://t.me/b"),
        ]];

        let body = request_body(42, &payload, &buttons);

        assert_eq!(body["chat_id"], 42);
        assert_eq!(body["video"], "BAAC");
        assert_eq!(body["caption"], "<b>Part 1</b>");
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["protect_content"], true);
        assert_eq!(body["reply_markup"]["inline_keyboard"][0][1]["url"], "https://t.me/b");
    }

    #[test]
    fn test_text_body_without_buttons() {
        let body = request_body(7, &Payload::text("hi"), &[]);

        assert_eq!(body["text"], "hi");
        assert!(body.get("reply_markup").is_none());
        assert!(body.get("protect_content").is_none());
    }

    #[test]
    fn test_interpret_success() {
        let ack = interpret(200, response(r#"{"ok": true, "result": {"message_id": 991}}"#)).unwrap();
        assert_eq!(ack.message_id, Some(991));
    }

    #[test]
    fn test_interpret_rate_limit() {
        let body = r#"{"ok": false, "error_code": 429, "description": "Too Many Requests: retry after 14", "parameters": {"retry_after": 14}}"#;
        assert_eq!(interpret(429, response(body)), Err(TransportError::RateLimited(14)));
        assert_eq!(
            interpret(429, response(r#"{"ok": false}"#)),
            Err(TransportError::RateLimited(DEFAULT_RETRY_AFTER_SECS))
        );
    }

    #[test]
    fn test_interpret_permanent_rejections() {
        let blocked = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let not_found = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        assert_eq!(interpret(403, response(blocked)), Err(TransportError::PermanentReject));
        assert_eq!(interpret(400, response(not_found)), Err(TransportError::PermanentReject));
    }

    #[test]
    fn test_interpret_server_and_unknown_errors() {
        assert_eq!(
            interpret(502, response(r#"{"ok": false, "description": "Bad Gateway"}"#)),
            Err(TransportError::Transient)
        );
        assert_eq!(
            interpret(409, response(r#"{"ok": false, "description": "Conflict"}"#)),
            Err(TransportError::Unknown("Conflict".to_string()))
        );
        assert_eq!(
            interpret(200, response(r#"{"ok": false}"#)),
            Err(TransportError::Unknown("HTTP 200".to_string()))
        );
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let transport = TelegramTransport::new(
            Client::new(),
            "https://api.telegram.org/",
            "123:abc",
            Duration::from_secs(5),
        );
        assert_eq!(
            transport.method_url("sendPhoto"),
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
    }
}
