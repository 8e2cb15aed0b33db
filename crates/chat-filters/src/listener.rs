//! Change notifications.

use std::sync::{Arc, Weak};

use crate::{conversation::ConversationId, filter::FilterId};

/// Receives the changes of a [`FilterStore`](crate::FilterStore).
///
/// Notifications are delivered synchronously, before the store operation
/// that caused them returns.
pub trait FilterListListener: Send + Sync {
    /// The filter list, or the membership of one of its filters, changed.
    /// Re-read whatever state is needed from the store.
    fn on_filter_list_changed(&self);

    /// A conversation joined (`is_member == true`) or left a filter.
    fn on_membership_changed(
        &self,
        filter_id: FilterId,
        conversation_id: ConversationId,
        is_member: bool,
    ) {
        let _ = (filter_id, conversation_id, is_member);
    }
}

/// The listeners registered with a store.
///
/// Only weak references are kept: a subscription ends when the subscriber
/// drops its `Arc`.
#[derive(Default)]
pub(crate) struct Listeners {
    listeners: Vec<Weak<dyn FilterListListener>>,
}

impl Listeners {
    pub fn add<L>(&mut self, listener: &Arc<L>)
    where
        L: FilterListListener + 'static,
    {
        let listener: Weak<L> = Arc::downgrade(listener);
        self.listeners.push(listener);
    }

    /// The number of listeners that are still alive.
    pub fn len(&self) -> usize {
        self.listeners.iter().filter(|listener| listener.strong_count() > 0).count()
    }

    pub fn notify_list_changed(&mut self) {
        for listener in self.live() {
            listener.on_filter_list_changed();
        }
    }

    pub fn notify_membership_changed(
        &mut self,
        filter_id: FilterId,
        conversation_id: ConversationId,
        is_member: bool,
    ) {
        for listener in self.live() {
            listener.on_membership_changed(filter_id, conversation_id, is_member);
        }
    }

    fn prune(&mut self) {
        self.listeners.retain(|listener| listener.strong_count() > 0);
    }

    fn live(&mut self) -> Vec<Arc<dyn FilterListListener>> {
        self.prune();
        self.listeners.iter().filter_map(Weak::upgrade).collect()
    }
}
