//! Local copy of the shared message log.
//!
//! This module provides the client-held view of the conversation with:
//! - Full replacement from an authoritative poll response
//! - Deduplicated append of a confirmed send
//! - Ordering by server-assigned id, never by timestamp
//!
//! The server is the only writer of sequence order. The view never holds a
//! message the server has not accepted.

use pollchat_types::{Message, MessageId};
use std::collections::BTreeMap;

/// Result of replacing the view with a poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Merge {
    /// Number of messages in the view after the merge.
    pub total: usize,
    /// Messages whose id was not in the view before the merge.
    pub added: usize,
    /// Duplicate ids dropped from the response.
    pub duplicates: usize,
}

/// Ordered, id-unique sequence of messages.
///
/// Keyed by [`MessageId`] so iteration is always ascending and a given id
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogView {
    messages: BTreeMap<MessageId, Message>,
}

impl LogView {
    /// Create an empty view.
    pub fn new() -> Self {
        Self {
            messages: BTreeMap::new(),
        }
    }

    /// Replace the whole view with an authoritative sequence.
    ///
    /// The response is the full history, not a delta. When the response
    /// repeats an id, the first occurrence wins.
    pub fn replace_with(&mut self, response: Vec<Message>) -> Merge {
        let mut next = BTreeMap::new();
        let mut duplicates = 0;

        for message in response {
            if next.contains_key(&message.id) {
                duplicates += 1;
                continue;
            }
            next.insert(message.id, message);
        }

        let added = next
            .keys()
            .filter(|id| !self.messages.contains_key(id))
            .count();

        self.messages = next;

        Merge {
            total: self.messages.len(),
            added,
            duplicates,
        }
    }

    /// Add a message the server has just confirmed.
    ///
    /// Returns `false` without touching the view when the id is already
    /// present, e.g. because a concurrent poll incorporated it first.
    pub fn append_confirmed(&mut self, message: Message) -> bool {
        if self.messages.contains_key(&message.id) {
            return false;
        }
        self.messages.insert(message.id, message);
        true
    }

    /// Number of messages in the view.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the view is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate messages in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Messages with an id strictly greater than `after`.
    pub fn after(&self, after: MessageId) -> Vec<Message> {
        self.messages
            .range((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Owned copy of the view for presentation.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.values().cloned().collect()
    }

    /// Drop every message (used on teardown).
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
