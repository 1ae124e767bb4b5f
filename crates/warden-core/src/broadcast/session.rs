//! Broadcast session controller: a per-administrator dialogue that collects
//! audience, payload, and confirmation.
//!
//! The state machine is an explicit tagged value held in a map keyed by admin
//! id. While a session is active the message router sends all of that admin's
//! messages here instead of through moderation. Input errors re-prompt in
//! place; only cancel/confirmation/terminal errors discard the session.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::warn;

use crate::{
    broadcast::{AudienceKind, BroadcastJob},
    domain::{ChatId, UserId},
    messaging::types::OutgoingPayload,
    registry::{GroupRow, Registry},
    scheduler::{DelayedAction, Scheduler},
};

/// What the admin sent, as mapped by the adapter.
#[derive(Clone, Debug)]
pub enum AdminInput {
    Text(String),
    Media(OutgoingPayload),
    /// Stickers, voice notes, anything the broadcast payload cannot carry.
    Unsupported,
}

/// Audience as bound during the dialogue (a specific group is resolved from
/// the snapshot immediately; the other kinds stay symbolic until dispatch).
#[derive(Clone, Debug)]
enum Audience {
    AllOptedInUsers,
    AllGroups,
    Group(GroupRow),
}

#[derive(Clone, Debug)]
enum SessionState {
    SelectingAudience,
    SelectingGroup { snapshot: Vec<GroupRow> },
    Composing { audience: Audience },
    Confirming { audience: Audience, payload: OutgoingPayload },
}

pub struct BroadcastController {
    admin_id: UserId,
    preview_max_len: usize,
    registry: Arc<Registry>,
    scheduler: Scheduler,
    sessions: Mutex<HashMap<i64, SessionState>>,
}

const MENU: &str = "Broadcast options:\n1) All bot users\n2) All groups\n3) Specific group\nReply with 1/2/3";

impl BroadcastController {
    pub fn new(
        admin_id: UserId,
        preview_max_len: usize,
        registry: Arc<Registry>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            admin_id,
            preview_max_len,
            registry,
            scheduler,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<i64, SessionState>> {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn has_session(&self, user: UserId) -> bool {
        self.sessions().contains_key(&user.0)
    }

    /// Entry point for /broadcast. Non-admin invokers are rejected and no
    /// session is created.
    pub fn start(&self, user: UserId) -> String {
        if user != self.admin_id {
            return "❌ Admin only.".to_string();
        }
        self.sessions()
            .insert(user.0, SessionState::SelectingAudience);
        MENU.to_string()
    }

    /// Feed one admin message into the active session. Returns `None` when no
    /// session exists for this user (callers fall through to moderation).
    pub fn handle_input(&self, user: UserId, input: AdminInput) -> Option<String> {
        let mut sessions = self.sessions();
        let state = sessions.remove(&user.0)?;

        let (next, reply) = match state {
            SessionState::SelectingAudience => self.on_selecting_audience(input),
            SessionState::SelectingGroup { snapshot } => self.on_selecting_group(snapshot, input),
            SessionState::Composing { audience } => self.on_composing(audience, input),
            SessionState::Confirming { audience, payload } => {
                self.on_confirming(audience, payload, input)
            }
        };

        if let Some(next) = next {
            sessions.insert(user.0, next);
        }
        Some(reply)
    }

    fn on_selecting_audience(&self, input: AdminInput) -> (Option<SessionState>, String) {
        let AdminInput::Text(choice) = input else {
            return (Some(SessionState::SelectingAudience), invalid_option());
        };

        match choice.trim() {
            "1" => {
                let count = self.registry.opted_in_user_count().unwrap_or_default();
                (
                    Some(SessionState::Composing {
                        audience: Audience::AllOptedInUsers,
                    }),
                    format!("Selected all bot users ({count}) — send the message to broadcast."),
                )
            }
            "2" => {
                let count = self.registry.group_count().unwrap_or_default();
                (
                    Some(SessionState::Composing {
                        audience: Audience::AllGroups,
                    }),
                    format!("Selected all groups ({count}) — send the message to broadcast."),
                )
            }
            "3" => {
                let snapshot = match self.registry.list_groups() {
                    Ok(groups) => groups,
                    Err(e) => {
                        warn!("could not snapshot group list: {e}");
                        return (
                            Some(SessionState::SelectingAudience),
                            "Could not load the group list; try again.".to_string(),
                        );
                    }
                };
                if snapshot.is_empty() {
                    // Nothing to pick from; end the session.
                    return (
                        None,
                        "No known groups. Add the bot to a group first.".to_string(),
                    );
                }
                let listing = snapshot
                    .iter()
                    .enumerate()
                    .map(|(i, g)| format!("{}. {} (id:{})", i + 1, group_title(g), g.group_id))
                    .collect::<Vec<_>>()
                    .join("\n");
                (
                    Some(SessionState::SelectingGroup { snapshot }),
                    format!("Available groups:\n{listing}\nReply with the group number"),
                )
            }
            _ => (Some(SessionState::SelectingAudience), invalid_option()),
        }
    }

    fn on_selecting_group(
        &self,
        snapshot: Vec<GroupRow>,
        input: AdminInput,
    ) -> (Option<SessionState>, String) {
        let AdminInput::Text(text) = input else {
            return (
                Some(SessionState::SelectingGroup { snapshot }),
                "Please reply with the group number.".to_string(),
            );
        };

        let Ok(index) = text.trim().parse::<usize>() else {
            return (
                Some(SessionState::SelectingGroup { snapshot }),
                "Please reply with the group number.".to_string(),
            );
        };

        // 1-based index into the snapshot taken at selection time.
        if index == 0 || index > snapshot.len() {
            return (
                Some(SessionState::SelectingGroup { snapshot }),
                "Invalid number. Try again.".to_string(),
            );
        }

        let group = snapshot[index - 1].clone();
        let reply = format!(
            "Selected: {} (id:{}). Now send the message to broadcast.",
            group_title(&group),
            group.group_id
        );
        (
            Some(SessionState::Composing {
                audience: Audience::Group(group),
            }),
            reply,
        )
    }

    fn on_composing(&self, audience: Audience, input: AdminInput) -> (Option<SessionState>, String) {
        let payload = match input {
            AdminInput::Text(text) => OutgoingPayload::Text { text },
            AdminInput::Media(payload) => payload,
            AdminInput::Unsupported => {
                return (
                    Some(SessionState::Composing { audience }),
                    "Send text, a photo, or a document.".to_string(),
                );
            }
        };

        // The audience size here is display-only; the dispatcher resolves the
        // real target set when the job runs.
        let target_info = match &audience {
            Audience::AllOptedInUsers => format!(
                "All bot users ({})",
                self.registry.opted_in_user_count().unwrap_or_default()
            ),
            Audience::AllGroups => format!(
                "All groups ({})",
                self.registry.group_count().unwrap_or_default()
            ),
            Audience::Group(g) => format!("{} (id:{})", group_title(g), g.group_id),
        };

        let reply = format!(
            "Preview:\nTarget: {target_info}\nType: {}\n\nType 'confirm' to send or anything else to cancel",
            payload.preview(self.preview_max_len)
        );
        (
            Some(SessionState::Confirming { audience, payload }),
            reply,
        )
    }

    fn on_confirming(
        &self,
        audience: Audience,
        payload: OutgoingPayload,
        input: AdminInput,
    ) -> (Option<SessionState>, String) {
        let confirmed = matches!(
            &input,
            AdminInput::Text(t) if t.trim().eq_ignore_ascii_case("confirm")
        );
        if !confirmed {
            return (None, "Cancelled.".to_string());
        }

        let (kind, selected_group) = match audience {
            Audience::AllOptedInUsers => (AudienceKind::AllOptedInUsers, None),
            Audience::AllGroups => (AudienceKind::AllGroups, None),
            Audience::Group(g) => (AudienceKind::SpecificGroup, Some(ChatId(g.group_id))),
        };
        let job = BroadcastJob {
            audience: kind,
            payload,
            selected_group,
            report_recipient: ChatId(self.admin_id.0),
        };

        match self.scheduler.schedule_now(DelayedAction::Broadcast(job)) {
            Ok(()) => (
                None,
                "✅ Queued. You will get a report when finished.".to_string(),
            ),
            Err(e) => {
                warn!("failed to queue broadcast: {e}");
                (
                    None,
                    "❌ Failed to queue broadcast; try again later.".to_string(),
                )
            }
        }
    }
}

fn invalid_option() -> String {
    "Invalid option. Reply 1, 2 or 3".to_string()
}

fn group_title(g: &GroupRow) -> &str {
    if g.group_name.is_empty() {
        "NoTitle"
    } else {
        &g.group_name
    }
}
