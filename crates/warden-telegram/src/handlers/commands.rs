use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use warden_core::{domain::ChatId, messaging::port::notify, registry::Registry};

use crate::handlers::user_id;
use crate::router::AppState;

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let uid = user_id(user);
    let chat_id = ChatId(msg.chat.id.0);

    // "/stats@botname arg" -> "/stats"
    let command = text.split_whitespace().next().unwrap_or("");
    let command = command.split('@').next().unwrap_or(command);

    match command {
        "/start" => {
            // Opt-in for direct broadcasts; only meaningful in a private chat.
            if !msg.chat.is_private() {
                return Ok(());
            }
            state.registry.upsert_opted_in_user(
                uid,
                user.username.as_deref(),
                Some(user.first_name.as_str()),
                user.last_name.as_deref(),
            );
            let reply = format!(
                "Hi {}! Bot started. Your ID: {}\nYou will receive broadcasts if admin sends them.",
                user.first_name, uid.0
            );
            notify(state.transport.as_ref(), chat_id, &reply).await;
        }
        "/stats" => {
            if !state.cfg.stats_public && uid != state.admin {
                notify(state.transport.as_ref(), chat_id, "❌ Admin only.").await;
                return Ok(());
            }
            let reply = render_stats(&state.registry);
            notify(state.transport.as_ref(), chat_id, &reply).await;
        }
        "/reload" => {
            if uid != state.admin {
                notify(state.transport.as_ref(), chat_id, "❌ Admin only.").await;
                return Ok(());
            }
            let reply = match state.banned.reload() {
                Ok(count) => format!("✅ Banned words reloaded ({count})"),
                Err(e) => format!("❌ Reload failed: {e}"),
            };
            notify(state.transport.as_ref(), chat_id, &reply).await;
        }
        "/broadcast" => {
            let reply = state.controller.start(uid);
            notify(state.transport.as_ref(), chat_id, &reply).await;
        }
        _ => {}
    }

    Ok(())
}

fn render_stats(registry: &Registry) -> String {
    let total_groups = registry.group_count().unwrap_or_default();
    let total_users = registry.distinct_user_count().unwrap_or_default();
    let stats = registry.moderation_stats().unwrap_or_default();

    let breakdown = if stats.by_reason.is_empty() {
        "• No deletions yet".to_string()
    } else {
        stats
            .by_reason
            .iter()
            .map(|(reason, count)| format!("• {reason}: {count}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "📊 Live Stats\n\n👥 Groups: {total_groups}\n👤 Total Users: {total_users}\n🗑️ Total Deleted: {}\n\nBreakdown:\n{breakdown}",
        stats.total_deleted
    )
}
