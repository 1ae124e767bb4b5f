//! Telegram adapter (teloxide).
//!
//! Implements the `warden-core` TransportPort over the Telegram Bot API and
//! hosts the polling router plus update handlers.

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile, ApiError, RequestError};

pub mod handlers;
pub mod router;

use warden_core::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::{
        port::TransportPort,
        types::{SendError, SendResult},
    },
};

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }
}

/// Map a Telegram failure onto the delivery-failure taxonomy. Errors the
/// recipient caused (blocked or kicked the bot, deactivated account) are
/// `Unauthorized`; everything else keeps a short label for the audit trail.
/// No retry, not even for rate limits: a skipped target is an acceptable
/// outcome, a stalled fan-out is not.
fn classify_error(e: &RequestError) -> SendError {
    match e {
        RequestError::Api(
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation,
        ) => SendError::Unauthorized,
        RequestError::Network(e) if e.is_timeout() => SendError::Timeout,
        RequestError::RetryAfter(_) => SendError::Other("RateLimited".to_string()),
        RequestError::Api(api) => SendError::Other(format!("{api}")),
        other => SendError::Other(format!("{other}")),
    }
}

#[async_trait]
impl TransportPort for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> SendResult<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(|e| classify_error(&e))?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        let mut req = self
            .bot
            .send_photo(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        let msg = req.await.map_err(|e| classify_error(&e))?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_id: &str,
        caption: Option<&str>,
    ) -> SendResult<MessageRef> {
        let mut req = self
            .bot
            .send_document(Self::tg_chat(chat_id), InputFile::file_id(file_id.to_string()));
        if let Some(c) = caption {
            req = req.caption(c.to_string());
        }
        let msg = req.await.map_err(|e| classify_error(&e))?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn delete_message(&self, msg: MessageRef) -> SendResult<()> {
        self.bot
            .delete_message(Self::tg_chat(msg.chat_id), Self::tg_msg_id(msg.message_id))
            .await
            .map_err(|e| classify_error(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_caused_errors_are_unauthorized() {
        assert_eq!(
            classify_error(&RequestError::Api(ApiError::BotBlocked)),
            SendError::Unauthorized
        );
        assert_eq!(
            classify_error(&RequestError::Api(ApiError::BotKickedFromSupergroup)),
            SendError::Unauthorized
        );
        assert_eq!(
            classify_error(&RequestError::Api(ApiError::UserDeactivated)),
            SendError::Unauthorized
        );
    }

    #[test]
    fn other_api_errors_keep_a_label() {
        let e = classify_error(&RequestError::Api(ApiError::ChatNotFound));
        assert!(matches!(e, SendError::Other(_)));
    }

    #[test]
    fn rate_limits_are_not_retried() {
        let e = classify_error(&RequestError::RetryAfter(std::time::Duration::from_secs(5)));
        assert_eq!(e, SendError::Other("RateLimited".to_string()));
    }
}
