//! The live list of conversations belonging to one filter.

use std::collections::HashSet;

use eyeball_im::{ObservableVector, VectorDiff};
use futures_core::Stream;
use imbl::Vector;
use tracing::trace;

use crate::{conversation::ConversationId, filter::FilterId, pinned::PinnedList};

/// The derived membership index of one filter.
///
/// Entries are laid out as the visible pinned conversations, in pinned order,
/// followed by every other member in the order it joined. Subscribers observe
/// each change as a [`VectorDiff`].
#[derive(Debug)]
pub struct ChatListIndex {
    filter_id: FilterId,
    members: HashSet<ConversationId>,
    pinned: PinnedList,
    pinned_len: usize,
    entries: ObservableVector<ConversationId>,
}

impl ChatListIndex {
    pub(crate) fn new(filter_id: FilterId) -> Self {
        Self {
            filter_id,
            members: HashSet::new(),
            pinned: PinnedList::default(),
            pinned_len: 0,
            entries: ObservableVector::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, conversation: ConversationId) -> bool {
        self.members.contains(&conversation)
    }

    /// The members, pinned ones first.
    pub fn entries(&self) -> Vec<ConversationId> {
        self.entries.iter().copied().collect()
    }

    /// The pinned members, in pinned order.
    pub fn pinned(&self) -> Vec<ConversationId> {
        self.entries.iter().take(self.pinned_len).copied().collect()
    }

    /// Subscribe to the entries: the current values, and a stream of the
    /// changes made from now on.
    pub fn subscribe(
        &self,
    ) -> (Vector<ConversationId>, impl Stream<Item = VectorDiff<ConversationId>> + use<>) {
        self.entries.subscribe().into_values_and_stream()
    }

    /// Add a member. Returns `false` if it already was one.
    pub(crate) fn insert(&mut self, conversation: ConversationId) -> bool {
        if !self.members.insert(conversation) {
            return false;
        }

        trace!(filter_id = %self.filter_id, %conversation, "Conversation joined the filter");

        self.entries.push_back(conversation);

        if self.pinned.is_requested(conversation) {
            self.relayout_pinned();
        }

        true
    }

    /// Remove a member. Returns `false` if it was not one.
    pub(crate) fn remove(&mut self, conversation: ConversationId) -> bool {
        if !self.members.remove(&conversation) {
            return false;
        }

        trace!(filter_id = %self.filter_id, %conversation, "Conversation left the filter");

        if let Some(position) = self.position(conversation) {
            self.entries.remove(position);

            if position < self.pinned_len {
                self.pinned_len -= 1;
            }
        }

        true
    }

    /// Replace the pinned sequence. Requested pins that are not members are
    /// remembered but not surfaced until they join.
    pub(crate) fn set_pinned(&mut self, pinned: &[ConversationId], limit: usize) -> bool {
        if !self.pinned.replace(pinned, limit) {
            return false;
        }

        self.relayout_pinned();
        true
    }

    fn position(&self, conversation: ConversationId) -> Option<usize> {
        self.entries.iter().position(|entry| *entry == conversation)
    }

    /// Move the visible pins to the head of the entries, and the formerly
    /// pinned members that lost their pin to the tail.
    fn relayout_pinned(&mut self) {
        let members = &self.members;
        let visible = self.pinned.visible(|id| members.contains(&id));
        let previous: Vec<_> = self.entries.iter().take(self.pinned_len).copied().collect();

        // `entries[..index]` already holds `visible[..index]`, so the next pin
        // is always found at or after `index`.
        for (index, conversation) in visible.iter().copied().enumerate() {
            if let Some(position) = self.position(conversation)
                && position != index
            {
                let value = self.entries.remove(position);
                self.entries.insert(index, value);
            }
        }

        for conversation in previous.into_iter().filter(|id| !visible.contains(id)) {
            if let Some(position) = self.position(conversation) {
                let value = self.entries.remove(position);
                self.entries.push_back(value);
            }
        }

        self.pinned_len = visible.len();
    }
}
