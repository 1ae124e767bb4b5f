//! Admin broadcast: a per-admin dialogue that captures intent
//! ([`session`]) and a detached fan-out job that delivers it
//! ([`dispatcher`]).

pub mod dispatcher;
pub mod session;

use crate::domain::ChatId;
use crate::messaging::types::OutgoingPayload;

/// Which set of recipients a broadcast run targets. The concrete id list is
/// resolved at dispatch time, not at selection time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudienceKind {
    AllOptedInUsers,
    AllGroups,
    SpecificGroup,
}

impl AudienceKind {
    pub fn label(self) -> &'static str {
        match self {
            AudienceKind::AllOptedInUsers => "all bot users",
            AudienceKind::AllGroups => "all groups",
            AudienceKind::SpecificGroup => "specific group",
        }
    }
}

/// Everything a detached broadcast run needs. Built by the session controller
/// at confirmation and handed to the scheduler.
#[derive(Clone, Debug)]
pub struct BroadcastJob {
    pub audience: AudienceKind,
    pub payload: OutgoingPayload,
    /// Bound only for `AudienceKind::SpecificGroup`.
    pub selected_group: Option<ChatId>,
    /// Where the terminal summary (or abort notice) goes.
    pub report_recipient: ChatId,
}
