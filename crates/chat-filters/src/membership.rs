//! Deciding whether a conversation belongs to a filter.

use crate::{
    conversation::{ConversationId, ConversationKind, ConversationRegistry},
    filter::{FilterEntity, PredicateFlags},
};

/// Map a conversation classification to the category flag selecting it.
fn category_of(kind: ConversationKind) -> PredicateFlags {
    match kind {
        ConversationKind::Bot => PredicateFlags::BOTS,
        ConversationKind::Contact => PredicateFlags::CONTACTS,
        ConversationKind::NonContact => PredicateFlags::NON_CONTACTS,
        ConversationKind::Group => PredicateFlags::GROUPS,
        ConversationKind::Channel => PredicateFlags::CHANNELS,
    }
}

/// Evaluates filter predicates against a [`ConversationRegistry`].
///
/// The evaluator keeps no state of its own: every call reads the current
/// conversation attributes and recomputes the result.
#[derive(Clone, Copy)]
pub struct MembershipEvaluator<'a> {
    registry: &'a dyn ConversationRegistry,
}

impl<'a> MembershipEvaluator<'a> {
    pub fn new(registry: &'a dyn ConversationRegistry) -> Self {
        Self { registry }
    }

    /// Whether `conversation` belongs to `filter`.
    ///
    /// The never-set wins over everything, the always-set wins over the
    /// category and exclusion rules.
    pub fn contains(&self, filter: &FilterEntity, conversation: ConversationId) -> bool {
        if filter.never().contains(&conversation) {
            return false;
        }

        if filter.always().contains(&conversation) {
            return true;
        }

        let flags = filter.flags();

        flags.contains(category_of(self.registry.classify(conversation)))
            && self.passes_exclusions(flags, conversation)
    }

    fn passes_exclusions(&self, flags: PredicateFlags, conversation: ConversationId) -> bool {
        let registry = self.registry;
        let in_known_main_folder =
            || registry.folder_known(conversation) && !registry.is_archived(conversation);

        if flags.contains(PredicateFlags::EXCLUDE_MUTED)
            && registry.is_muted(conversation)
            // Muted conversations that mention the user stay visible.
            && !(registry.has_unread_mentions(conversation) && in_known_main_folder())
        {
            return false;
        }

        if flags.contains(PredicateFlags::EXCLUDE_READ)
            && !is_unread(
                registry.has_unread_mark(conversation),
                registry.has_unread_mentions(conversation),
                registry.unread_count(conversation),
            )
        {
            return false;
        }

        // An unknown folder placement does not pass either.
        if flags.contains(PredicateFlags::EXCLUDE_ARCHIVED) && !in_known_main_folder() {
            return false;
        }

        true
    }
}

fn is_unread(marked_unread: bool, unread_mentions: bool, unread_count: u64) -> bool {
    marked_unread || unread_mentions || unread_count > 0
}
