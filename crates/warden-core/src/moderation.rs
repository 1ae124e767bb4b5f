//! Per-message content moderation.
//!
//! Rules are evaluated in fixed order and the first match wins, so a message
//! triggers at most one act path even when it matches several rules.

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    banlist::BannedWords,
    domain::{ChatId, ChatKind, MessageRef, UserId},
    messaging::{port::notify, port::TransportPort, types::InboundMessage},
    registry::Registry,
    scheduler::{DelayedAction, Scheduler},
    utils::iso_timestamp_utc,
};

const MEDIA_CONTENT_PLACEHOLDER: &str = "URL in media";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModerationReason {
    Url,
    BannedWord,
}

impl ModerationReason {
    /// Label stored in the moderation log and shown in admin reports.
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationReason::Url => "URL",
            ModerationReason::BannedWord => "Banned word",
        }
    }

    fn warning(self) -> &'static str {
        match self {
            ModerationReason::Url => "links are not allowed.",
            ModerationReason::BannedWord => "your message contains banned content.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Act(ModerationReason),
}

pub struct ModerationEngine {
    admin_id: UserId,
    /// Where moderation reports go (the admin's direct chat).
    report_chat: ChatId,
    warning_delete_delay: Duration,
    registry: Arc<Registry>,
    banned: Arc<BannedWords>,
    scheduler: Scheduler,
    transport: Arc<dyn TransportPort>,
}

impl ModerationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admin_id: UserId,
        warning_delete_delay: Duration,
        registry: Arc<Registry>,
        banned: Arc<BannedWords>,
        scheduler: Scheduler,
        transport: Arc<dyn TransportPort>,
    ) -> Self {
        Self {
            admin_id,
            report_chat: ChatId(admin_id.0),
            warning_delete_delay,
            registry,
            banned,
            scheduler,
            transport,
        }
    }

    /// Classify a message. Pure; all side effects live in [`handle`].
    ///
    /// [`handle`]: ModerationEngine::handle
    pub fn decide(&self, msg: &InboundMessage) -> Decision {
        if msg.sender.id == self.admin_id {
            return Decision::Allow;
        }
        if msg.chat_kind == ChatKind::Private {
            return Decision::Allow;
        }
        if msg.has_url {
            return Decision::Act(ModerationReason::Url);
        }
        if let Some(text) = &msg.text {
            if self.banned.matches(text) {
                return Decision::Act(ModerationReason::BannedWord);
            }
        }
        Decision::Allow
    }

    /// Process one inbound message: group bookkeeping always happens, then the
    /// act pipeline runs if a rule matched.
    pub async fn handle(&self, msg: &InboundMessage) {
        if msg.chat_kind == ChatKind::Group {
            self.registry
                .upsert_group(msg.chat_id, msg.chat_title.as_deref().unwrap_or(""));
            self.registry
                .upsert_membership(msg.sender.id, msg.chat_id, msg.sender.username.as_deref());
        }

        match self.decide(msg) {
            Decision::Allow => {}
            Decision::Act(reason) => self.act(msg, reason).await,
        }
    }

    async fn act(&self, msg: &InboundMessage, reason: ModerationReason) {
        // Delete the offending message; it may already be gone.
        let original = MessageRef {
            chat_id: msg.chat_id,
            message_id: msg.message_id,
        };
        if let Err(e) = self.transport.delete_message(original).await {
            debug!("could not delete offending message: {e}");
        }

        // Warn the sender and schedule the warning's own cleanup.
        let warning_text = format!(
            "⚠️ {}, {}",
            msg.sender.first_name_or_id(),
            reason.warning()
        );
        match self.transport.send_text(msg.chat_id, &warning_text).await {
            Ok(warning) => {
                if let Err(e) = self
                    .scheduler
                    .schedule_after(self.warning_delete_delay, DelayedAction::DeleteMessage(warning))
                {
                    warn!("failed to schedule warning cleanup: {e}");
                    notify(
                        self.transport.as_ref(),
                        self.report_chat,
                        &format!("⚠️ Could not schedule warning cleanup: {e}"),
                    )
                    .await;
                }
            }
            Err(e) => warn!("failed to send moderation warning: {e}"),
        }

        let content = msg.text.as_deref().unwrap_or(MEDIA_CONTENT_PLACEHOLDER);
        self.registry
            .append_moderation_log(msg.chat_id, msg.sender.id, content, reason.as_str());

        let report = format!(
            "🚫 Deleted message\nUser: {}\nGroup: {} (id:{})\nReason: {}\nTime: {}\nContent: {content}",
            msg.sender.display_label(),
            msg.chat_title.as_deref().unwrap_or("NoTitle"),
            msg.chat_id.0,
            reason.as_str(),
            iso_timestamp_utc(),
        );
        notify(self.transport.as_ref(), self.report_chat, &report).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::dispatcher::DispatchConfig;
    use crate::domain::{MessageId, Sender};
    use crate::scheduler::ActionRunner;
    use crate::testing::RecordingTransport;

    const ADMIN: i64 = 1000;

    fn banlist(words: &str) -> Arc<BannedWords> {
        let path = std::path::PathBuf::from(format!(
            "/tmp/warden-modtest-{}-{}.txt",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&path, words).unwrap();
        let list = Arc::new(BannedWords::load(&path).unwrap());
        let _ = std::fs::remove_file(&path);
        list
    }

    fn engine(
        transport: Arc<RecordingTransport>,
        registry: Arc<Registry>,
        words: &str,
    ) -> ModerationEngine {
        let scheduler = Scheduler::spawn(ActionRunner {
            transport: transport.clone(),
            registry: registry.clone(),
            dispatch: DispatchConfig::default(),
        });
        ModerationEngine::new(
            UserId(ADMIN),
            Duration::from_secs(20),
            registry,
            banlist(words),
            scheduler,
            transport,
        )
    }

    fn group_msg(sender_id: i64, text: Option<&str>, has_url: bool) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(-500),
            chat_kind: ChatKind::Group,
            chat_title: Some("Test Group".to_string()),
            message_id: MessageId(77),
            sender: Sender {
                id: UserId(sender_id),
                username: Some("someone".to_string()),
                first_name: Some("Sam".to_string()),
                last_name: None,
            },
            text: text.map(String::from),
            has_url,
        }
    }

    #[tokio::test]
    async fn decide_follows_rule_order() {
        let transport = Arc::new(RecordingTransport::default());
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let engine = engine(transport, registry, "spam\n");

        // Admin is always allowed, even with a URL and a banned word.
        assert_eq!(
            engine.decide(&group_msg(ADMIN, Some("spam http://x"), true)),
            Decision::Allow
        );

        // Private chats are never moderated.
        let mut private = group_msg(2, Some("spam"), true);
        private.chat_kind = ChatKind::Private;
        assert_eq!(engine.decide(&private), Decision::Allow);

        // URL wins over banned word when both are present.
        assert_eq!(
            engine.decide(&group_msg(2, Some("spam http://x"), true)),
            Decision::Act(ModerationReason::Url)
        );
        assert_eq!(
            engine.decide(&group_msg(2, Some("this is SPAM"), false)),
            Decision::Act(ModerationReason::BannedWord)
        );
        assert_eq!(
            engine.decide(&group_msg(2, Some("a normal message"), false)),
            Decision::Allow
        );
    }

    #[tokio::test(start_paused = true)]
    async fn banned_word_triggers_full_act_pipeline() {
        let transport = Arc::new(RecordingTransport::default());
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let engine = engine(transport.clone(), registry.clone(), "spam\n");

        engine.handle(&group_msg(2, Some("buy SPAM now"), false)).await;

        // Original deleted exactly once.
        assert_eq!(transport.deleted(), vec![(-500, 77)]);

        // Warning in the group, exactly one report to the admin.
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, -500);
        assert!(sent[0].1.contains("Sam"));
        assert!(sent[0].1.contains("banned content"));
        assert_eq!(sent[1].0, ADMIN);
        assert!(sent[1].1.contains("Banned word"));
        assert!(sent[1].1.contains("buy SPAM now"));

        // Log entry with the right reason.
        let stats = registry.moderation_stats().unwrap();
        assert_eq!(stats.total_deleted, 1);
        assert_eq!(stats.by_reason, vec![("Banned word".to_string(), 1)]);

        // The warning is cleaned up after the configured delay.
        tokio::time::sleep(Duration::from_secs(21)).await;
        tokio::task::yield_now().await;
        let deleted = transport.deleted();
        assert_eq!(deleted.len(), 2);
        assert_eq!(deleted[1].0, -500);
    }

    #[tokio::test(start_paused = true)]
    async fn url_in_media_logs_placeholder() {
        let transport = Arc::new(RecordingTransport::default());
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let engine = engine(transport.clone(), registry.clone(), "");

        engine.handle(&group_msg(2, None, true)).await;

        let sent = transport.sent();
        assert!(sent[1].1.contains("URL in media"));
        let stats = registry.moderation_stats().unwrap();
        assert_eq!(stats.by_reason, vec![("URL".to_string(), 1)]);
    }

    #[tokio::test]
    async fn allowed_group_message_still_updates_bookkeeping() {
        let transport = Arc::new(RecordingTransport::default());
        let registry = Arc::new(Registry::open_in_memory().unwrap());
        let engine = engine(transport.clone(), registry.clone(), "spam\n");

        engine.handle(&group_msg(2, Some("hello"), false)).await;

        assert_eq!(registry.group_count().unwrap(), 1);
        assert_eq!(registry.distinct_user_count().unwrap(), 1);
        assert!(transport.sent().is_empty());
        assert!(transport.deleted().is_empty());
    }
}
