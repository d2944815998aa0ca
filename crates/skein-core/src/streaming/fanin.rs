//! Fan-in of live events from multiple backends into per-conversation
//! streams.
//!
//! The same identity-and-ordering discipline as the timeline merge, but for
//! an append-only stream: each event is keyed, duplicates are dropped, and
//! latest-wins variants (read receipts, typing) are replaced in place.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::events::UnifiedChatEvent;

/// How an event delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// New event, appended to its conversation stream.
    Applied,
    /// Redelivery of an already-seen event, dropped.
    Duplicate,
    /// Latest-wins redelivery, replaced the stored event.
    Overwrote,
}

#[derive(Debug, Default)]
pub struct EventFanIn {
    seen: HashSet<String>,
    by_conversation: HashMap<String, Vec<UnifiedChatEvent>>,
}

impl EventFanIn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one delivered event into its conversation stream.
    pub fn apply(&mut self, event: UnifiedChatEvent) -> Delivery {
        let key = event.dedupe_key();
        let conversation_id = event.conversation_id().to_string();

        if self.seen.contains(&key) {
            if !event.is_latest_wins() {
                debug!(%key, "duplicate event delivery dropped");
                return Delivery::Duplicate;
            }
            let stream = self.by_conversation.entry(conversation_id).or_default();
            if let Some(stored) = stream.iter_mut().find(|e| e.dedupe_key() == key) {
                *stored = event;
            }
            stream.sort_by(|a, b| {
                a.occurred_at()
                    .cmp(&b.occurred_at())
                    .then_with(|| a.dedupe_key().cmp(&b.dedupe_key()))
            });
            return Delivery::Overwrote;
        }

        self.seen.insert(key);
        let stream = self.by_conversation.entry(conversation_id).or_default();
        let pos = stream.partition_point(|e| {
            (e.occurred_at(), e.dedupe_key()) <= (event.occurred_at(), event.dedupe_key())
        });
        stream.insert(pos, event);
        Delivery::Applied
    }

    /// Events for a conversation, oldest first.
    pub fn events(&self, conversation_id: &str) -> &[UnifiedChatEvent] {
        self.by_conversation
            .get(conversation_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn conversation_ids(&self) -> impl Iterator<Item = &str> {
        self.by_conversation.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::events::ConversationUpdateKind;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn message(conversation: &str, id: &str, secs: i64) -> UnifiedChatEvent {
        UnifiedChatEvent::MessageReceived {
            conversation_id: conversation.into(),
            message_id: id.into(),
            sender: "alice".into(),
            body: format!("message {id}"),
            sent_at: at(secs),
        }
    }

    #[test]
    fn events_route_to_their_conversation() {
        let mut fanin = EventFanIn::new();
        fanin.apply(message("c1", "m1", 10));
        fanin.apply(message("c2", "m2", 20));
        assert_eq!(fanin.events("c1").len(), 1);
        assert_eq!(fanin.events("c2").len(), 1);
        assert!(fanin.events("c3").is_empty());
    }

    #[test]
    fn redelivered_message_is_dropped() {
        let mut fanin = EventFanIn::new();
        assert_eq!(fanin.apply(message("c1", "m1", 10)), Delivery::Applied);
        assert_eq!(fanin.apply(message("c1", "m1", 10)), Delivery::Duplicate);
        assert_eq!(fanin.events("c1").len(), 1);
    }

    #[test]
    fn stream_stays_ordered_regardless_of_arrival() {
        let mut fanin = EventFanIn::new();
        fanin.apply(message("c1", "m3", 30));
        fanin.apply(message("c1", "m1", 10));
        fanin.apply(message("c1", "m2", 20));
        let times: Vec<i64> = fanin
            .events("c1")
            .iter()
            .map(|e| e.occurred_at().timestamp())
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn read_receipt_redelivery_overwrites() {
        let mut fanin = EventFanIn::new();
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
        assert_eq!(fanin.apply(first), Delivery::Applied);
        assert_eq!(fanin.apply(later.clone()), Delivery::Overwrote);
        assert_eq!(fanin.events("c1"), &[later]);
    }

    #[test]
    fn conversation_started_and_left_both_retained() {
        let mut fanin = EventFanIn::new();
        fanin.apply(UnifiedChatEvent::ConversationUpdate {
            conversation_id: "c1".into(),
            kind: ConversationUpdateKind::Started,
            occurred_at: at(10),
        });
        fanin.apply(UnifiedChatEvent::ConversationUpdate {
            conversation_id: "c1".into(),
            kind: ConversationUpdateKind::Left,
            occurred_at: at(20),
        });
        assert_eq!(fanin.events("c1").len(), 2);
    }

    #[test]
    fn same_reactor_distinct_values_are_retained() {
        let mut fanin = EventFanIn::new();
        for value in ["👍", "❤️"] {
            fanin.apply(UnifiedChatEvent::ReactionAdded {
                conversation_id: "c1".into(),
                message_id: "m1".into(),
                reactor: "alice".into(),
                value: value.into(),
                reacted_at: at(10),
            });
        }
        assert_eq!(fanin.events("c1").len(), 2);
    }

    #[test]
    fn deletion_does_not_collide_with_its_message() {
        let mut fanin = EventFanIn::new();
        fanin.apply(message("c1", "m1", 10));
        let delivery = fanin.apply(UnifiedChatEvent::MessageDeleted {
            conversation_id: "c1".into(),
            message_id: "m1".into(),
            deleted_at: at(20),
        });
        assert_eq!(delivery, Delivery::Applied);
        assert_eq!(fanin.events("c1").len(), 2);
    }
}
