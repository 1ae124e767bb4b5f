//! Shared registry of groups, memberships, opted-in users, and append-only
//! audit tables.
//!
//! One coarse lock scopes exactly one statement; related writes (upsert group
//! then upsert membership) are not atomic as a unit and rely on
//! insert-or-ignore / insert-or-replace semantics to stay correct under races.
//! Writes are best-effort: a failed statement is logged and swallowed so the
//! calling action (deletion, warning, broadcast) proceeds regardless.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection};
use tracing::{info, warn};

use crate::{
    domain::{ChatId, UserId},
    Result,
};

/// A known group chat, kept forever once observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRow {
    pub group_id: i64,
    pub group_name: String,
}

/// Join/leave action recorded in the membership event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipAction {
    Join,
    Leave,
}

impl MembershipAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipAction::Join => "join",
            MembershipAction::Leave => "leave",
        }
    }
}

/// Aggregates served by /stats.
#[derive(Clone, Debug, Default)]
pub struct ModerationStats {
    pub total_deleted: i64,
    pub by_reason: Vec<(String, i64)>,
}

pub struct Registry {
    conn: Mutex<Connection>,
}

impl Registry {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        migrate(&conn)?;
        info!("registry opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory registry, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another statement panicked; the
        // connection itself is still usable.
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn best_effort(&self, what: &str, f: impl FnOnce(&Connection) -> rusqlite::Result<usize>) {
        let conn = self.lock();
        if let Err(e) = f(&conn) {
            warn!("registry write failed ({what}): {e}");
        }
    }

    // -- Writes (best-effort audit) --

    /// No-op when the group is already known.
    pub fn upsert_group(&self, group_id: ChatId, name: &str) {
        self.best_effort("upsert group", |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO groups (group_id, group_name) VALUES (?1, ?2)",
                params![group_id.0, name],
            )
        });
    }

    /// Last known username of `user` in `group`; replace-on-conflict.
    pub fn upsert_membership(&self, user: UserId, group: ChatId, username: Option<&str>) {
        self.best_effort("upsert membership", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users (user_id, group_id, username) VALUES (?1, ?2, ?3)",
                params![user.0, group.0, username],
            )
        });
    }

    /// Record a user who started a direct conversation (broadcast target).
    pub fn upsert_opted_in_user(
        &self,
        user: UserId,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) {
        self.best_effort("upsert opted-in user", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO bot_users (user_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user.0, username, first_name, last_name],
            )
        });
    }

    pub fn append_moderation_log(&self, group: ChatId, user: UserId, content: &str, reason: &str) {
        self.best_effort("append moderation log", |conn| {
            conn.execute(
                "INSERT INTO deleted_messages (group_id, user_id, content, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                params![group.0, user.0, content, reason],
            )
        });
    }

    pub fn append_membership_event(&self, group: ChatId, user: UserId, action: MembershipAction) {
        self.best_effort("append membership event", |conn| {
            conn.execute(
                "INSERT INTO join_leave_events (group_id, user_id, action) VALUES (?1, ?2, ?3)",
                params![group.0, user.0, action.as_str()],
            )
        });
    }

    pub fn append_failed_delivery(&self, target_id: i64, target_label: &str, reason: &str) {
        self.best_effort("append failed delivery", |conn| {
            conn.execute(
                "INSERT INTO failed_deliveries (target_id, target_name, reason)
                 VALUES (?1, ?2, ?3)",
                params![target_id, target_label, reason],
            )
        });
    }

    // -- Reads --

    pub fn group_count(&self) -> Result<i64> {
        let conn = self.lock();
        let n = conn.query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn distinct_user_count(&self) -> Result<i64> {
        let conn = self.lock();
        let n = conn.query_row("SELECT COUNT(DISTINCT user_id) FROM users", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }

    pub fn opted_in_user_count(&self) -> Result<i64> {
        let conn = self.lock();
        let n = conn.query_row("SELECT COUNT(*) FROM bot_users", [], |row| row.get(0))?;
        Ok(n)
    }

    pub fn moderation_stats(&self) -> Result<ModerationStats> {
        let conn = self.lock();
        let total_deleted =
            conn.query_row("SELECT COUNT(*) FROM deleted_messages", [], |row| row.get(0))?;

        let mut stmt =
            conn.prepare("SELECT reason, COUNT(*) FROM deleted_messages GROUP BY reason")?;
        let by_reason = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

        Ok(ModerationStats {
            total_deleted,
            by_reason,
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT group_id, group_name FROM groups ORDER BY group_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(GroupRow {
                    group_id: row.get(0)?,
                    group_name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn opted_in_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT user_id FROM bot_users")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(rows)
    }

    pub fn failed_delivery_count(&self) -> Result<i64> {
        let conn = self.lock();
        let n = conn.query_row("SELECT COUNT(*) FROM failed_deliveries", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS groups (
            group_id    INTEGER PRIMARY KEY,
            group_name  TEXT
        );

        CREATE TABLE IF NOT EXISTS users (
            user_id     INTEGER,
            group_id    INTEGER,
            username    TEXT,
            PRIMARY KEY (user_id, group_id)
        );

        CREATE TABLE IF NOT EXISTS bot_users (
            user_id     INTEGER PRIMARY KEY,
            username    TEXT,
            first_name  TEXT,
            last_name   TEXT,
            registered_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS deleted_messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id    INTEGER,
            user_id     INTEGER,
            content     TEXT,
            reason      TEXT,
            timestamp   DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS join_leave_events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id    INTEGER,
            user_id     INTEGER,
            action      TEXT,
            timestamp   DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS failed_deliveries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            target_id   INTEGER,
            target_name TEXT,
            reason      TEXT,
            timestamp   DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        ",
    )
}
