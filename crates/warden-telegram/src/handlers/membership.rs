use std::sync::Arc;

use teloxide::{prelude::*, types::ChatMemberUpdated, types::Message};

use tracing::{debug, warn};

use warden_core::{
    domain::ChatId,
    messaging::port::notify,
    registry::MembershipAction,
    scheduler::DelayedAction,
};

use crate::handlers::{sender_from, user_id};
use crate::router::AppState;

/// Greet each new member; the greeting is cleaned up on the same delay as
/// moderation warnings.
pub async fn welcome_new_members(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(members) = msg.new_chat_members() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);

    for user in members {
        let text = format!(
            "👋 Welcome, {} {}!\n\n• Username: @{}\n• ID: {}\n\nRules:\n1. No spam\n2. No links\n3. Be respectful",
            user.first_name,
            user.last_name.as_deref().unwrap_or(""),
            user.username.as_deref().unwrap_or("NoUsername"),
            user.id.0,
        );
        match state.transport.send_text(chat_id, &text).await {
            Ok(sent) => {
                if let Err(e) = state
                    .scheduler
                    .schedule_after(state.cfg.warning_delete_delay, DelayedAction::DeleteMessage(sent))
                {
                    warn!("failed to schedule welcome cleanup: {e}");
                }
            }
            Err(e) => warn!("failed to send welcome: {e}"),
        }
    }
    Ok(())
}

/// A user's status changed in a chat the bot watches: record the event and
/// tell the admin.
pub async fn handle_chat_member(event: ChatMemberUpdated, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(event.chat.id.0);
    let user = &event.new_chat_member.user;

    let action = if event.new_chat_member.kind.is_member() {
        MembershipAction::Join
    } else {
        MembershipAction::Leave
    };
    state
        .registry
        .append_membership_event(chat_id, user_id(user), action);

    let note = format!(
        "User {} changed status in {}",
        sender_from(user).display_label(),
        event.chat.title().unwrap_or("NoTitle"),
    );
    notify(state.transport.as_ref(), ChatId(state.admin.0), &note).await;
    Ok(())
}

/// The bot's own status changed: record the group once the bot is a member,
/// so the broadcast group picker knows about it even before anyone speaks.
pub async fn handle_my_chat_member(
    event: ChatMemberUpdated,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let kind = &event.new_chat_member.kind;
    let present = kind.is_member() || kind.is_administrator() || kind.is_owner();

    if present && !event.chat.is_private() {
        let title = event.chat.title().unwrap_or("No Title");
        state.registry.upsert_group(ChatId(event.chat.id.0), title);
        debug!("recorded group {} ({})", title, event.chat.id.0);
    } else {
        debug!("bot status changed in chat {}", event.chat.id.0);
    }
    Ok(())
}
