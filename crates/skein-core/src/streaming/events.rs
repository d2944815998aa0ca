//! Unified live events from the chat/notification backends.
//!
//! Backends redeliver events, so every variant derives a dedupe key; the
//! fan-in uses it to drop duplicates (or overwrite, for latest-wins
//! variants). Routing is by `conversation_id` on every variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversationUpdateKind {
    Started,
    Left,
    Renamed,
}

impl ConversationUpdateKind {
    fn key_part(&self) -> &'static str {
        match self {
            ConversationUpdateKind::Started => "started",
            ConversationUpdateKind::Left => "left",
            ConversationUpdateKind::Renamed => "renamed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnifiedChatEvent {
    MessageReceived {
        conversation_id: String,
        message_id: String,
        sender: String,
        body: String,
        sent_at: DateTime<Utc>,
    },
    MessageDeleted {
        conversation_id: String,
        message_id: String,
        deleted_at: DateTime<Utc>,
    },
    ConversationUpdate {
        conversation_id: String,
        kind: ConversationUpdateKind,
        occurred_at: DateTime<Utc>,
    },
    /// Only the latest receipt per (conversation, account) matters;
    /// redelivery overwrites instead of duplicating.
    ReadReceipt {
        conversation_id: String,
        account_id: String,
        last_read_at: DateTime<Utc>,
    },
    ReactionAdded {
        conversation_id: String,
        message_id: String,
        reactor: String,
        value: String,
        reacted_at: DateTime<Utc>,
    },
    ReactionRemoved {
        conversation_id: String,
        message_id: String,
        reactor: String,
        value: String,
        removed_at: DateTime<Utc>,
    },
    /// Transient; latest indicator per (conversation, account) wins.
    Typing {
        conversation_id: String,
        account_id: String,
        started_at: DateTime<Utc>,
    },
}

impl UnifiedChatEvent {
    /// Routing key: which conversation's stream this event belongs to.
    pub fn conversation_id(&self) -> &str {
        match self {
            UnifiedChatEvent::MessageReceived { conversation_id, .. }
            | UnifiedChatEvent::MessageDeleted { conversation_id, .. }
            | UnifiedChatEvent::ConversationUpdate { conversation_id, .. }
            | UnifiedChatEvent::ReadReceipt { conversation_id, .. }
            | UnifiedChatEvent::ReactionAdded { conversation_id, .. }
            | UnifiedChatEvent::ReactionRemoved { conversation_id, .. }
            | UnifiedChatEvent::Typing { conversation_id, .. } => conversation_id,
        }
    }

    /// Dedupe key. Messages and deletions key by message id; conversation
    /// updates by (conversation, kind); receipts and typing by
    /// (conversation, account); reactions by (message, reactor, value) with
    /// polarity so an add and its matching remove are both retained.
    pub fn dedupe_key(&self) -> String {
        match self {
            UnifiedChatEvent::MessageReceived { message_id, .. } => format!("msg:{message_id}"),
            UnifiedChatEvent::MessageDeleted { message_id, .. } => format!("del:{message_id}"),
            UnifiedChatEvent::ConversationUpdate {
                conversation_id,
                kind,
                ..
            } => format!("conv:{conversation_id}:{}", kind.key_part()),
            UnifiedChatEvent::ReadReceipt {
                conversation_id,
                account_id,
                ..
            } => format!("receipt:{conversation_id}:{account_id}"),
            UnifiedChatEvent::ReactionAdded {
                message_id,
                reactor,
                value,
                ..
            } => format!("reaction+:{message_id}:{reactor}:{value}"),
            UnifiedChatEvent::ReactionRemoved {
                message_id,
                reactor,
                value,
                ..
            } => format!("reaction-:{message_id}:{reactor}:{value}"),
            UnifiedChatEvent::Typing {
                conversation_id,
                account_id,
                ..
            } => format!("typing:{conversation_id}:{account_id}"),
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UnifiedChatEvent::MessageReceived { sent_at, .. } => *sent_at,
            UnifiedChatEvent::MessageDeleted { deleted_at, .. } => *deleted_at,
            UnifiedChatEvent::ConversationUpdate { occurred_at, .. } => *occurred_at,
            UnifiedChatEvent::ReadReceipt { last_read_at, .. } => *last_read_at,
            UnifiedChatEvent::ReactionAdded { reacted_at, .. } => *reacted_at,
            UnifiedChatEvent::ReactionRemoved { removed_at, .. } => *removed_at,
            UnifiedChatEvent::Typing { started_at, .. } => *started_at,
        }
    }

    /// Variants where redelivery replaces the stored event instead of being
    /// dropped as a duplicate.
    pub fn is_latest_wins(&self) -> bool {
        matches!(
            self,
            UnifiedChatEvent::ReadReceipt { .. } | UnifiedChatEvent::Typing { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn message_and_deletion_keys_differ() {
        let received = UnifiedChatEvent::MessageReceived {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            sender: "alice".into(),
            body: "hi".into(),
            sent_at: at(10),
        };
        let deleted = UnifiedChatEvent::MessageDeleted {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            deleted_at: at(20),
        };
        assert_ne!(received.dedupe_key(), deleted.dedupe_key());
    }

    #[test]
    fn conversation_updates_key_by_kind() {
        let started = UnifiedChatEvent::ConversationUpdate {
            conversation_id: "c1".into(),
            kind: ConversationUpdateKind::Started,
            occurred_at: at(10),
        };
        let left = UnifiedChatEvent::ConversationUpdate {
            conversation_id: "c1".into(),
            kind: ConversationUpdateKind::Left,
            occurred_at: at(20),
        };
        assert_ne!(started.dedupe_key(), left.dedupe_key());
    }

    #[test]
    fn distinct_reaction_values_get_distinct_keys() {
        let thumbs = UnifiedChatEvent::ReactionAdded {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            reactor: "alice".into(),
            value: "👍".into(),
            reacted_at: at(10),
        };
        let heart = UnifiedChatEvent::ReactionAdded {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            reactor: "alice".into(),
            value: "❤️".into(),
            reacted_at: at(10),
        };
        assert_ne!(thumbs.dedupe_key(), heart.dedupe_key());
    }

    #[test]
    fn reaction_add_and_remove_are_distinct_events() {
        let added = UnifiedChatEvent::ReactionAdded {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            reactor: "alice".into(),
            value: "👍".into(),
            reacted_at: at(10),
        };
        let removed = UnifiedChatEvent::ReactionRemoved {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            reactor: "alice".into(),
            value: "👍".into(),
            removed_at: at(20),
        };
        assert_ne!(added.dedupe_key(), removed.dedupe_key());
    }

    #[test]
    fn receipts_key_by_conversation_and_account() {
        let first = UnifiedChatEvent::ReadReceipt {
            conversation_id: "c1".into(),
            account_id: "alice".into(),
            last_read_at: at(10),
        };
        let later = UnifiedChatEvent::ReadReceipt {
            conversation_id: "c1".into(),
            account_id: "alice".into(),
            last_read_at: at(50),
        };
        assert_eq!(first.dedupe_key(), later.dedupe_key());
        assert!(later.is_latest_wins());
    }
}
