//! Telegram update handlers.
//!
//! Routing order for messages: membership service messages first, then
//! commands, then input for an active broadcast session, and finally the
//! moderation pipeline for everything else.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{Message, MessageEntity, MessageEntityKind, User},
};

use warden_core::{
    domain::{ChatId, ChatKind, MessageId, Sender, UserId},
    messaging::types::InboundMessage,
};

use crate::router::AppState;

mod broadcast;
mod commands;
mod membership;

pub use membership::{handle_chat_member, handle_my_chat_member};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    if msg.new_chat_members().is_some() {
        return membership::welcome_new_members(msg, state).await;
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            return commands::handle_command(msg, state).await;
        }
    }

    if let Some(user) = msg.from() {
        if state.controller.has_session(user_id(user)) {
            return broadcast::handle_session_input(msg, state).await;
        }
    }

    // Messages without a sender (channel posts, service messages) are skipped.
    if let Some(inbound) = to_inbound(&msg) {
        state.moderation.handle(&inbound).await;
    }
    Ok(())
}

pub(crate) fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

pub(crate) fn sender_from(user: &User) -> Sender {
    Sender {
        id: user_id(user),
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

fn to_inbound(msg: &Message) -> Option<InboundMessage> {
    let user = msg.from()?;
    Some(InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        chat_kind: if msg.chat.is_private() {
            ChatKind::Private
        } else {
            ChatKind::Group
        },
        chat_title: msg.chat.title().map(str::to_owned),
        message_id: MessageId(msg.id.0),
        sender: sender_from(user),
        text: msg.text().or_else(|| msg.caption()).map(str::to_owned),
        has_url: has_url_entity(msg),
    })
}

fn has_url_entity(msg: &Message) -> bool {
    fn any_url(entities: Option<&[MessageEntity]>) -> bool {
        entities
            .map(|es| {
                es.iter().any(|e| {
                    matches!(
                        e.kind,
                        MessageEntityKind::Url | MessageEntityKind::TextLink { .. }
                    )
                })
            })
            .unwrap_or(false)
    }

    any_url(msg.entities()) || any_url(msg.caption_entities())
}
