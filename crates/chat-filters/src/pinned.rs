//! The ordered, bounded pinned sub-list of a filter.

use std::collections::HashSet;

use crate::conversation::ConversationId;

/// Collect `requested` into a pinned sequence: duplicates are skipped and
/// everything past `limit` entries is dropped.
pub(crate) fn bounded(
    requested: impl IntoIterator<Item = ConversationId>,
    limit: usize,
) -> Vec<ConversationId> {
    let mut seen = HashSet::new();

    requested.into_iter().filter(|id| seen.insert(*id)).take(limit).collect()
}

/// The pinned conversations a derived index surfaces first.
///
/// The list remembers what the filter asks to pin, but only conversations
/// that are currently members of the index are ever surfaced, so the visible
/// pinned entries are always an ordered subset of the membership.
#[derive(Clone, Debug, Default)]
pub(crate) struct PinnedList {
    requested: Vec<ConversationId>,
}

impl PinnedList {
    /// Replace the requested pins. Returns `false` if nothing changed.
    pub fn replace(&mut self, requested: &[ConversationId], limit: usize) -> bool {
        let requested = bounded(requested.iter().copied(), limit);

        if requested == self.requested {
            return false;
        }

        self.requested = requested;
        true
    }

    pub fn is_requested(&self, id: ConversationId) -> bool {
        self.requested.contains(&id)
    }

    /// The pins to surface, given which conversations are members.
    pub fn visible(&self, is_member: impl Fn(ConversationId) -> bool) -> Vec<ConversationId> {
        self.requested.iter().copied().filter(|id| is_member(*id)).collect()
    }
}
