//! Deduplicating merge of durable and volatile message sequences.
//!
//! The merge is a pure function so sync can be reasoned about (and tested)
//! without any store in the picture.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parley_types::chat::Message;
use parley_types::config::DedupStrategy;
use uuid::Uuid;

/// Identity of a message for deduplication purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MessageKey<'a> {
    Content(DateTime<Utc>, &'a str),
    Id(Uuid),
}

fn key_of(message: &Message, strategy: DedupStrategy) -> MessageKey<'_> {
    match (strategy, message.id) {
        (DedupStrategy::MessageId, Some(id)) => MessageKey::Id(id),
        _ => MessageKey::Content(message.timestamp, message.body.as_str()),
    }
}

/// Result of merging volatile messages into a durable sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// Deduplicated union, ordered by timestamp.
    pub messages: Vec<Message>,
    /// Volatile messages whose key was not already present.
    pub added: usize,
}

/// Union of `durable` and `volatile`, deduplicated and ordered by timestamp.
///
/// Durable messages go in first, so on a key collision the durable copy is
/// the one kept. Duplicates inside `durable` itself are collapsed too. The
/// sort is stable: messages with equal timestamps keep durable-then-volatile
/// arrival order.
///
/// Under `DedupStrategy::MessageId` a message with an id and one without
/// never collide, even when their content matches.
pub fn merge(durable: &[Message], volatile: &[Message], strategy: DedupStrategy) -> Merged {
    let mut seen: HashSet<MessageKey<'_>> = HashSet::with_capacity(durable.len() + volatile.len());
    let mut messages = Vec::with_capacity(durable.len() + volatile.len());

    for message in durable {
        if seen.insert(key_of(message, strategy)) {
            messages.push(message.clone());
        }
    }

    let mut added = 0;
    for message in volatile {
        if seen.insert(key_of(message, strategy)) {
            messages.push(message.clone());
            added += 1;
        }
    }

    messages.sort_by_key(|m| m.timestamp);
    Merged { messages, added }
}

/// [`merge`] without the count.
pub fn dedupe_union(
    durable: &[Message],
    volatile: &[Message],
    strategy: DedupStrategy,
) -> Vec<Message> {
    merge(durable, volatile, strategy).messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn msg(secs: i64, body: &str) -> Message {
        Message {
            id: None,
            timestamp: t(secs),
            sender_id: "u1".to_string(),
            body: body.to_string(),
        }
    }

    fn bodies(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.body.as_str()).collect()
    }

    #[test]
    fn test_disjoint_sets_keep_everything_sorted() {
        let durable = vec![msg(1, "a"), msg(5, "e"), msg(3, "c")];
        let volatile = vec![msg(4, "d"), msg(2, "b")];

        let merged = dedupe_union(&durable, &volatile, DedupStrategy::TimestampBody);

        assert_eq!(merged.len(), durable.len() + volatile.len());
        assert_eq!(bodies(&merged), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_shared_message_appears_once() {
        let durable = vec![msg(1, "hi")];
        let volatile = vec![msg(1, "hi"), msg(2, "there")];

        let merged = dedupe_union(&durable, &volatile, DedupStrategy::TimestampBody);

        assert_eq!(bodies(&merged), vec!["hi", "there"]);
    }

    #[test]
    fn test_durable_copy_wins_on_collision() {
        let mut durable_copy = msg(1, "hi");
        durable_copy.sender_id = "from-durable".to_string();
        let mut volatile_copy = msg(1, "hi");
        volatile_copy.sender_id = "from-volatile".to_string();

        let merged = dedupe_union(&[durable_copy], &[volatile_copy], DedupStrategy::TimestampBody);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].sender_id, "from-durable");
    }

    #[test]
    fn test_same_body_different_timestamp_are_distinct() {
        let merged = dedupe_union(
            &[msg(1, "ok")],
            &[msg(2, "ok")],
            DedupStrategy::TimestampBody,
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let durable = vec![msg(1, "a"), msg(3, "c")];
        let volatile = vec![msg(2, "b"), msg(3, "c")];

        let once = dedupe_union(&durable, &volatile, DedupStrategy::TimestampBody);
        let twice = dedupe_union(&once, &volatile, DedupStrategy::TimestampBody);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_interleaved_input_order_does_not_matter() {
        let durable = vec![msg(9, "i"), msg(1, "a"), msg(5, "e")];
        let volatile = vec![msg(8, "h"), msg(2, "b"), msg(6, "f")];

        let merged = dedupe_union(&durable, &volatile, DedupStrategy::TimestampBody);

        assert!(merged.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_equal_timestamps_keep_arrival_order() {
        let merged = dedupe_union(
            &[msg(1, "first")],
            &[msg(1, "second")],
            DedupStrategy::TimestampBody,
        );
        assert_eq!(bodies(&merged), vec!["first", "second"]);
    }

    #[test]
    fn test_message_id_strategy_separates_content_collisions() {
        let mut a = msg(1, "same");
        a.id = Some(Uuid::now_v7());
        let mut b = msg(1, "same");
        b.id = Some(Uuid::now_v7());

        let by_content = dedupe_union(
            std::slice::from_ref(&a),
            std::slice::from_ref(&b),
            DedupStrategy::TimestampBody,
        );
        let by_id = dedupe_union(
            std::slice::from_ref(&a),
            std::slice::from_ref(&b),
            DedupStrategy::MessageId,
        );

        assert_eq!(by_content.len(), 1);
        assert_eq!(by_id.len(), 2);
    }

    #[test]
    fn test_message_id_strategy_collapses_same_id() {
        let mut a = msg(1, "x");
        a.id = Some(Uuid::now_v7());

        let merged = dedupe_union(
            std::slice::from_ref(&a),
            std::slice::from_ref(&a),
            DedupStrategy::MessageId,
        );
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_message_id_strategy_falls_back_without_ids() {
        let merged = dedupe_union(&[msg(1, "x")], &[msg(1, "x")], DedupStrategy::MessageId);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_added_counts_only_new_volatile_messages() {
        let durable = vec![msg(1, "a"), msg(1, "a")];
        let volatile = vec![msg(2, "b"), msg(1, "a"), msg(2, "b")];

        let merged = merge(&durable, &volatile, DedupStrategy::TimestampBody);

        assert_eq!(bodies(&merged.messages), vec!["a", "b"]);
        assert_eq!(merged.added, 1);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(dedupe_union(&[], &[], DedupStrategy::TimestampBody).is_empty());
    }
}
