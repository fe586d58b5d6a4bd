//! Campaign data model.
//!
//! These types are shared by the engine, the stores and the control API. The
//! serialized forms match the records the campaign state store persists:
//!
//! ```text
//! {"payload": {"type": "photo", "file_id": "...", "caption": "..."},
//!  "failed": [5, 9],
//!  "buttons": [[{"text": "Open", "url": "https://..."}]],
//!  "timestamp": "2024-01-01T00:00:00Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier a payload is delivered to.
pub type RecipientId = i64;

/// Operator that launched a campaign. Campaign state is keyed by this id.
pub type InitiatorId = i64;

/// Action buttons arranged in rows, rendered under the delivered message.
pub type ButtonRows = Vec<Vec<ActionButton>>;

// =============================================================================
// Payload
// =============================================================================

/// Content delivered to every recipient of a campaign.
///
/// Immutable for the lifetime of a campaign; retries reuse the stored copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Payload {
    Photo(Media),
    Video(Media),
    Document(Media),
    Audio(Media),
    Voice(Media),
    Text {
        /// Pre-formatted (HTML) message body
        #[serde(default)]
        text: String,
    },
}

/// Media reference plus its formatted caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Channel-side reference to previously uploaded media
    pub file_id: String,
    /// Pre-formatted (HTML) caption
    #[serde(default)]
    pub caption: String,
}

/// Kind tag of a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Text,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Photo => "photo",
            PayloadKind::Video => "video",
            PayloadKind::Document => "document",
            PayloadKind::Audio => "audio",
            PayloadKind::Voice => "voice",
            PayloadKind::Text => "text",
        }
    }
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Photo(_) => PayloadKind::Photo,
            Payload::Video(_) => PayloadKind::Video,
            Payload::Document(_) => PayloadKind::Document,
            Payload::Audio(_) => PayloadKind::Audio,
            Payload::Voice(_) => PayloadKind::Voice,
            Payload::Text { .. } => PayloadKind::Text,
        }
    }

    /// Media reference, if this payload carries one.
    pub fn media(&self) -> Option<&Media> {
        match self {
            Payload::Photo(m)
            | Payload::Video(m)
            | Payload::Document(m)
            | Payload::Audio(m)
            | Payload::Voice(m) => Some(m),
            Payload::Text { .. } => None,
        }
    }
}

/// Single inline button linking to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    #[serde(default)]
    pub text: String,
    pub url: String,
}

impl ActionButton {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a recipient was skipped instead of sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Listed in the blocked set; filtered before dispatch.
    Blocked,
    /// The channel permanently refused delivery to this recipient.
    Unreachable,
}

/// Final result for one recipient in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Success,
    Skipped(SkipReason),
    Failed,
}

// =============================================================================
// Campaign state and report
// =============================================================================

/// Resumable state of the last campaign an initiator ran.
///
/// There is at most one live state per initiator: every save replaces the
/// previous one wholesale, and a state with no pending failures is never kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignState {
    pub initiator_id: InitiatorId,
    pub payload: Payload,
    /// Recipients whose last attempt ended in a terminal failure, in dispatch order
    pub failed: Vec<RecipientId>,
    #[serde(default)]
    pub buttons: ButtonRows,
    pub timestamp: DateTime<Utc>,
}

impl CampaignState {
    pub fn new(
        initiator_id: InitiatorId,
        payload: Payload,
        failed: Vec<RecipientId>,
        buttons: ButtonRows,
    ) -> Self {
        Self {
            initiator_id,
            payload,
            failed,
            buttons,
            timestamp: Utc::now(),
        }
    }
}

/// Tally of one campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    pub total_recipients: usize,
    pub succeeded: usize,
    pub skipped_blocked: usize,
    pub skipped_unreachable: usize,
    /// Recipients that ended in a terminal failure; these drive a later retry
    pub failed: Vec<RecipientId>,
    pub generated_at: DateTime<Utc>,
}

impl CampaignReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Everything that did not reach the recipient, whatever the reason.
    pub fn not_sent(&self) -> usize {
        self.skipped_blocked + self.skipped_unreachable + self.failed_count()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_payload_serialization() {
        let payload = Payload::Photo(Media {
            file_id: "AgACAgIAAx0".to_string(),
            caption: "<b>New</b> episode".to_string(),
        });

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"type\":\"photo\""));
        assert!(json.contains("\"file_id\":\"AgACAgIAAx0\""));

        let parsed: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
        assert_eq!(parsed.kind(), PayloadKind::Photo);
    }

    #[test]
    fn test_text_payload_deserialization() {
        let json = r#"{"type": "text", "text": "hello <i>all</i>"}"#;
        let payload: Payload = serde_json::from_str(json).unwrap();

        assert_eq!(payload, Payload::text("hello <i>all</i>"));
        assert!(payload.media().is_none());
    }

    #[test]
    fn test_media_caption_defaults_to_empty() {
        let json = r#"{"type": "voice", "file_id": "AwACAgIAAxk"}"#;
        let payload: Payload = serde_json::from_str(json).unwrap();

        assert_eq!(payload.kind(), PayloadKind::Voice);
        assert_eq!(payload.media().map(|m| m.caption.as_str()), Some(""));
    }

    #[test]
    fn test_unknown_payload_type_rejected() {
        let json = r#"{"type": "sticker", "file_id": "x"}"#;
        assert!(serde_json::from_str::<Payload>(json).is_err());
    }

    #[test]
    fn test_report_not_sent() {
        let report = CampaignReport {
            total_recipients: 10,
            succeeded: 5,
            skipped_blocked: 2,
            skipped_unreachable: 1,
            failed: vec![7, 9],
            generated_at: Utc::now(),
        };

        assert_eq!(report.failed_count(), 2);
        assert_eq!(report.not_sent(), 5);
        assert!(report.has_failures());
    }
}
