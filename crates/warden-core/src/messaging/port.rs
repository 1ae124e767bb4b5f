use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::{OutgoingPayload, SendError, SendResult},
};

/// Chat-transport port.
///
/// Telegram is the first implementation; the shape is designed so another
/// messenger could fit behind the same interface. Every operation fails with a
/// classified `SendError` so callers can decide between "record and skip" and
/// "ignore".
#[async_trait]
pub trait TransportPort: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef>;

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()>;

    /// Dispatch a captured payload to whichever send operation matches its shape.
    async fn send_payload(
        &self,
        chat_id: ChatId,
        payload: &OutgoingPayload,
    ) -> SendResult<MessageRef> {
        match payload {
            OutgoingPayload::Text { text } => self.send_text(chat_id, text).await,
            OutgoingPayload::Photo { file_id, caption } => {
                self.send_photo(chat_id, file_id, caption.as_deref()).await
            }
            OutgoingPayload::Document {
                file_id, caption, ..
            } => {
                self.send_document(chat_id, file_id, caption.as_deref())
                    .await
            }
        }
    }
}

/// Best-effort send used for admin notices: failures are logged and dropped.
pub async fn notify(transport: &dyn TransportPort, chat_id: ChatId, text: &str) {
    if let Err(e) = transport.send_text(chat_id, text).await {
        log_send_failure(chat_id, &e);
    }
}

fn log_send_failure(chat_id: ChatId, e: &SendError) {
    tracing::warn!("failed to send notice to chat {}: {e}", chat_id.0);
}
