/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric). Group chats are negative, private chats match
/// the user id; we treat both as opaque.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric, per-chat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Kind of chat a message arrived in. Moderation only applies to groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// Identity of a message sender as observed on the wire.
#[derive(Clone, Debug)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Sender {
    /// `@username` when available, otherwise "First (id)" or the bare id.
    pub fn display_label(&self) -> String {
        if let Some(u) = &self.username {
            return format!("@{u}");
        }
        let name = self.first_name.as_deref().unwrap_or("").trim();
        if name.is_empty() {
            self.id.0.to_string()
        } else {
            format!("{name} ({})", self.id.0)
        }
    }

    /// Short form used to address the user in warnings.
    pub fn first_name_or_id(&self) -> String {
        match self.first_name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.id.0.to_string(),
        }
    }

    /// "First Last" with missing parts dropped.
    pub fn full_name(&self) -> String {
        let mut name = self.first_name.as_deref().unwrap_or("").trim().to_string();
        if let Some(last) = self.last_name.as_deref().map(str::trim) {
            if !last.is_empty() {
                if !name.is_empty() {
                    name.push(' ');
                }
                name.push_str(last);
            }
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(username: Option<&str>, first: Option<&str>) -> Sender {
        Sender {
            id: UserId(42),
            username: username.map(String::from),
            first_name: first.map(String::from),
            last_name: None,
        }
    }

    #[test]
    fn display_label_prefers_username() {
        assert_eq!(sender(Some("alice"), Some("Alice")).display_label(), "@alice");
        assert_eq!(sender(None, Some("Alice")).display_label(), "Alice (42)");
        assert_eq!(sender(None, None).display_label(), "42");
    }

    #[test]
    fn first_name_or_id_falls_back_to_id() {
        assert_eq!(sender(None, Some("Bob")).first_name_or_id(), "Bob");
        assert_eq!(sender(None, Some("  ")).first_name_or_id(), "42");
    }

    #[test]
    fn full_name_joins_parts() {
        let mut s = sender(None, Some("Ada"));
        s.last_name = Some("Lovelace".to_string());
        assert_eq!(s.full_name(), "Ada Lovelace");
        s.last_name = None;
        assert_eq!(s.full_name(), "Ada");
    }
}
