//! Message store for roomsync.
//!
//! This module provides the ordered, deduplicated collection of messages
//! that the presentation layer renders:
//! - Newest-first insertion order (never re-sorted by timestamp)
//! - At most one entry per message id
//! - Reconciliation of provisional entries against confirmed ones
//!
//! The store is pure. Sharing it between the snapshot loader, the live feed
//! and the send pipeline is done by sync-client, which performs each
//! operation below as a single atomic mutation.

use roomsync_types::{Message, MessageId, RoomId};
use std::collections::{HashSet, VecDeque};

/// Which branch [`MessageStore::replace_by_id`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// The old entry was replaced in place.
    Replaced,
    /// The new id was already present, so the old entry was removed instead.
    DuplicateDiscarded,
    /// Neither id was present; the new message was inserted at the head.
    Inserted,
}

/// Newest-first message sequence with dedup-by-id.
///
/// Messages flow into the store in three ways:
/// 1. `replace_all()` - seed from a snapshot fetched oldest-first
/// 2. `prepend()` - live feed deliveries and optimistic sends
/// 3. `replace_by_id()` / `remove_by_id()` - reconcile or roll back a send
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    /// Head is the newest insertion.
    messages: VecDeque<Message>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a snapshot.
    ///
    /// `oldest_first` is the backend's ascending creation order; the store
    /// reverses it so the most recent message ends up at the head. Duplicate
    /// ids keep their newest position.
    pub fn replace_all(&mut self, oldest_first: Vec<Message>) {
        let mut seen = HashSet::with_capacity(oldest_first.len());
        self.messages = oldest_first
            .into_iter()
            .rev()
            .filter(|msg| seen.insert(msg.id.clone()))
            .collect();
    }

    /// Insert at the head unless a message with the same id is present.
    ///
    /// Returns whether an insertion occurred.
    pub fn prepend(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push_front(message);
        true
    }

    /// Reconcile `old_id` against its authoritative counterpart.
    ///
    /// If `new_message.id` is already present (the live feed won the race)
    /// the `old_id` entry is dropped. Otherwise the `old_id` entry is replaced
    /// in place. If neither exists the message is inserted at the head.
    pub fn replace_by_id(&mut self, old_id: &MessageId, new_message: Message) -> ReplaceOutcome {
        if new_message.id != *old_id && self.contains(&new_message.id) {
            self.remove_by_id(old_id);
            return ReplaceOutcome::DuplicateDiscarded;
        }

        match self.position(old_id) {
            Some(index) => {
                self.messages[index] = new_message;
                ReplaceOutcome::Replaced
            }
            None => {
                self.messages.push_front(new_message);
                ReplaceOutcome::Inserted
            }
        }
    }

    /// Remove a message by id, returning it if present.
    pub fn remove_by_id(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.position(id)?;
        self.messages.remove(index)
    }

    /// Newest-first messages belonging to exactly `room_id`.
    pub fn view_for_room(&self, room_id: &RoomId) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|msg| msg.room_id == *room_id)
            .cloned()
            .collect()
    }

    /// Check whether a message id is present.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.position(id).is_some()
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|msg| msg.id == *id)
    }

    /// Iterate newest-first over every room's messages.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Number of messages held.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages still awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|msg| msg.is_pending()).count()
    }

    /// Remove every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|msg| msg.id == *id)
    }
}
