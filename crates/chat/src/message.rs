use std::fmt;

use rand::Rng;

/// Stable identifier for one message.
///
/// Allocated by the store and never reused, so per-message state survives
/// reordering and cannot alias across session resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

impl MessageId {
    /// Creates a typed message identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

/// Immutable chat entry. The store appends these and never edits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
        }
    }

    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::User, text)
    }

    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::Bot, text)
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }
}

const SESSION_SUFFIX_LEN: usize = 9;
const SESSION_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Client-generated conversation key sent as `session_id` on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// `session_<unix-millis>_<9 lowercase base36 chars>`.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix = (0..SESSION_SUFFIX_LEN)
            .map(|_| {
                SESSION_SUFFIX_ALPHABET[rng.random_range(0..SESSION_SUFFIX_ALPHABET.len())] as char
            })
            .collect::<String>();

        Self(format!(
            "session_{}_{suffix}",
            chrono::Utc::now().timestamp_millis()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_has_timestamp_and_base36_suffix() {
        let id = SessionId::generate();
        let parts = id.as_str().split('_').collect::<Vec<_>>();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().is_ok_and(|millis| millis > 0));
        assert_eq!(parts[2].len(), SESSION_SUFFIX_LEN);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn consecutive_session_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
