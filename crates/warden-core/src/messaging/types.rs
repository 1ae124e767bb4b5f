use crate::domain::{ChatId, ChatKind, MessageId, Sender};
use crate::utils::truncate_text;

/// A per-target delivery failure, classified so the dispatcher can record it
/// and move on. Never fatal to a broadcast run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendError {
    /// Recipient blocked the bot, was deactivated, or kicked the bot.
    Unauthorized,
    /// Transport-level timeout. Treated as terminal; no retry.
    Timeout,
    /// Anything else, carrying a short kind label for the audit trail.
    Other(String),
}

impl SendError {
    pub fn label(&self) -> String {
        match self {
            SendError::Unauthorized => "Unauthorized".to_string(),
            SendError::Timeout => "TimedOut".to_string(),
            SendError::Other(kind) => kind.clone(),
        }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

pub type SendResult<T> = std::result::Result<T, SendError>;

/// Payload of an outbound message, captured verbatim from the admin during a
/// broadcast session. Media is referenced by its transport file id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingPayload {
    Text {
        text: String,
    },
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        file_name: Option<String>,
        caption: Option<String>,
    },
}

impl OutgoingPayload {
    /// Deterministic one-line preview shown before confirmation.
    pub fn preview(&self, max_len: usize) -> String {
        match self {
            OutgoingPayload::Text { text } => format!("Text: {}", truncate_text(text, max_len)),
            OutgoingPayload::Photo { .. } => "Photo".to_string(),
            OutgoingPayload::Document { file_name, .. } => match file_name {
                Some(name) => format!("Document: {name}"),
                None => "Document".to_string(),
            },
        }
    }
}

/// Inbound message as seen by the moderation engine.
///
/// The adapter extracts everything moderation needs up front so the core never
/// touches transport-specific message types.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub chat_title: Option<String>,
    pub message_id: MessageId,
    pub sender: Sender,
    /// None for non-text media.
    pub text: Option<String>,
    /// True when the transport detected a URL entity in the message.
    pub has_url: bool,
}
