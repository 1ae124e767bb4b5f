use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use warden_core::{
    broadcast::session::AdminInput,
    domain::ChatId,
    messaging::{port::notify, types::OutgoingPayload},
};

use crate::handlers::user_id;
use crate::router::AppState;

/// Feed one admin message into the active broadcast session.
pub async fn handle_session_input(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };

    let input = to_admin_input(&msg);
    if let Some(reply) = state.controller.handle_input(user_id(user), input) {
        notify(state.transport.as_ref(), ChatId(msg.chat.id.0), &reply).await;
    }
    Ok(())
}

fn to_admin_input(msg: &Message) -> AdminInput {
    if let Some(text) = msg.text() {
        return AdminInput::Text(text.to_string());
    }

    // Largest photo size is last.
    if let Some(best) = msg.photo().and_then(|sizes| sizes.last()) {
        return AdminInput::Media(OutgoingPayload::Photo {
            file_id: best.file.id.clone(),
            caption: msg.caption().map(str::to_owned),
        });
    }

    if let Some(doc) = msg.document() {
        return AdminInput::Media(OutgoingPayload::Document {
            file_id: doc.file.id.clone(),
            file_name: doc.file_name.clone(),
            caption: msg.caption().map(str::to_owned),
        });
    }

    AdminInput::Unsupported
}
