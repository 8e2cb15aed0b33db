//! The client-local, ordered collection of filters.

use std::{collections::HashMap, fmt, sync::Arc};

use eyeball_im::VectorDiff;
use futures_core::Stream;
use imbl::Vector;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::FilterStoreConfig,
    conversation::{ConversationId, ConversationRegistry},
    error::{ConfigError, TransportError},
    filter::{FilterEntity, FilterId, FilterWireEntry},
    index::ChatListIndex,
    listener::{FilterListListener, Listeners},
    membership::MembershipEvaluator,
    reconcile::{self, FilterOrder, ReconcileStep},
};

/// Identifies one full-list request. Only the completion of the most recent
/// request is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadToken(u64);

/// What [`FilterStore::finish_load`] did with a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadCompletion {
    /// The response was reconciled into the store.
    Applied { changed: bool },
    /// The request failed; the list stays as it was until the next load.
    Failed,
    /// A newer request was issued meanwhile; the response was discarded.
    Superseded,
}

#[derive(Debug, Default)]
struct LoadState {
    in_flight: Option<LoadToken>,
    last_token: u64,
    loaded: bool,
}

/// The ordered filters of the user, each with a derived index of the
/// conversations it currently contains.
///
/// The order always mirrors the order the server declares. Every change of a
/// filter's rules updates its index incrementally, and every change that
/// affects the list or a membership notifies the registered
/// [`FilterListListener`]s before the operation returns.
pub struct FilterStore {
    config: FilterStoreConfig,
    registry: Arc<dyn ConversationRegistry>,
    filters: HashMap<FilterId, FilterEntity>,
    order: FilterOrder,
    indices: HashMap<FilterId, ChatListIndex>,
    listeners: Listeners,
    load: LoadState,
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStore")
            .field("config", &self.config)
            .field("order", &self.order)
            .field("load", &self.load)
            .finish_non_exhaustive()
    }
}

impl FilterStore {
    pub fn new(
        config: FilterStoreConfig,
        registry: Arc<dyn ConversationRegistry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            config,
            registry,
            filters: HashMap::new(),
            order: FilterOrder::new(),
            indices: HashMap::new(),
            listeners: Listeners::default(),
            load: LoadState::default(),
        })
    }

    pub fn config(&self) -> &FilterStoreConfig {
        &self.config
    }

    /// The filter ids, in server order.
    pub fn ids(&self) -> &[FilterId] {
        self.order.as_slice()
    }

    /// The filters, in server order.
    pub fn list(&self) -> impl Iterator<Item = &FilterEntity> + '_ {
        self.order.as_slice().iter().filter_map(|id| self.filters.get(id))
    }

    pub fn get(&self, id: FilterId) -> Option<&FilterEntity> {
        self.filters.get(&id)
    }

    pub fn has(&self, id: FilterId) -> bool {
        self.filters.contains_key(&id)
    }

    /// The derived index of a filter.
    pub fn index(&self, id: FilterId) -> Option<&ChatListIndex> {
        self.indices.get(&id)
    }

    /// Whether the derived index of `filter_id` currently holds
    /// `conversation_id`.
    pub fn contains(&self, filter_id: FilterId, conversation_id: ConversationId) -> bool {
        self.indices.get(&filter_id).is_some_and(|index| index.contains(conversation_id))
    }

    /// The filters currently containing a conversation, in server order.
    pub fn filters_containing(&self, conversation_id: ConversationId) -> Vec<FilterId> {
        self.order
            .as_slice()
            .iter()
            .copied()
            .filter(|id| self.contains(*id, conversation_id))
            .collect()
    }

    /// Subscribe to the derived index of a filter.
    pub fn subscribe_index(
        &self,
        id: FilterId,
    ) -> Option<(Vector<ConversationId>, impl Stream<Item = VectorDiff<ConversationId>> + use<>)>
    {
        self.indices.get(&id).map(ChatListIndex::subscribe)
    }

    /// Register a listener. It stays registered until the caller drops it.
    pub fn add_listener<L>(&mut self, listener: &Arc<L>)
    where
        L: FilterListListener + 'static,
    {
        self.listeners.add(listener);
    }

    /// The number of registered listeners that are still alive.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_loading(&self) -> bool {
        self.load.in_flight.is_some()
    }

    /// Whether a full list has been applied at least once.
    pub fn is_loaded(&self) -> bool {
        self.load.loaded
    }

    /// Start a full-list load.
    ///
    /// Returns `None` if a load is already in flight and `force` is not set.
    /// Otherwise the returned token supersedes any earlier one.
    pub fn begin_load(&mut self, force: bool) -> Option<LoadToken> {
        if self.load.in_flight.is_some() && !force {
            debug!("A filter list load is already in flight");
            return None;
        }

        self.load.last_token += 1;
        let token = LoadToken(self.load.last_token);

        if let Some(previous) = self.load.in_flight.replace(token) {
            debug!(?previous, "Superseding the in-flight filter list load");
        }

        info!(?token, "Loading the filter list");
        Some(token)
    }

    /// Apply the outcome of the request identified by `token`.
    #[instrument(skip(self, response))]
    pub fn finish_load(
        &mut self,
        token: LoadToken,
        response: Result<Vec<FilterWireEntry>, TransportError>,
    ) -> LoadCompletion {
        if self.load.in_flight != Some(token) {
            debug!("Discarding the response of a superseded filter list load");
            return LoadCompletion::Superseded;
        }

        self.load.in_flight = None;

        match response {
            Ok(entries) => {
                let changed = self.apply_full_list(&entries);
                self.load.loaded = true;
                info!(count = entries.len(), changed, "Filter list loaded");
                LoadCompletion::Applied { changed }
            }
            Err(error) => {
                warn!(%error, "Failed to load the filter list");
                LoadCompletion::Failed
            }
        }
    }

    /// Reconcile the store with an authoritative, ordered filter list.
    ///
    /// Returns whether anything changed; listeners are notified if so.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub fn apply_full_list(&mut self, entries: &[FilterWireEntry]) -> bool {
        let limit = self.config.pinned_limit;
        let mut authoritative = Vec::with_capacity(entries.len());
        let mut candidates = HashMap::with_capacity(entries.len());

        for entry in entries {
            if !entry.id.is_valid() {
                warn!(title = entry.title.as_str(), "Skipping a filter without a valid id");
                continue;
            }

            if !candidates.contains_key(&entry.id) {
                authoritative.push(entry.id);
                candidates.insert(entry.id, FilterEntity::from_wire(entry, limit));
            }
        }

        let steps = reconcile::sync_full_list(&mut self.order, &authoritative);
        let mut changed = false;

        for step in steps {
            debug!(?step, "Reconciling the filter list");

            match step {
                ReconcileStep::Insert { id, .. } => {
                    if let Some(candidate) = candidates.remove(&id) {
                        self.insert_new(candidate);
                    }
                    changed = true;
                }
                ReconcileStep::Keep { id, .. } | ReconcileStep::Swap { id, .. } => {
                    changed |= step.is_structural();
                    if let Some(candidate) = candidates.remove(&id) {
                        changed |= self.apply_change(candidate);
                    }
                }
                ReconcileStep::Remove { id } => {
                    self.drop_filter(id);
                    changed = true;
                }
            }
        }

        if changed {
            self.listeners.notify_list_changed();
        }

        changed
    }

    /// Insert or update a filter.
    ///
    /// A new filter is appended to the end of the list. Filters with the
    /// reserved id `0` are ignored. Returns whether anything changed.
    #[instrument(skip_all, fields(id = %filter.id()))]
    pub fn set(&mut self, filter: FilterEntity) -> bool {
        let id = filter.id();

        if !id.is_valid() {
            warn!("Ignoring a filter with the reserved id");
            return false;
        }

        let pinned = filter.pinned().to_vec();
        let filter = filter.with_pinned(pinned, self.config.pinned_limit);

        let changed = if self.filters.contains_key(&id) {
            self.apply_change(filter)
        } else {
            self.order.push(id);
            self.insert_new(filter);
            true
        };

        if changed {
            self.listeners.notify_list_changed();
        }

        changed
    }

    /// Remove a filter. Returns `false` if it was unknown.
    #[instrument(skip(self))]
    pub fn remove(&mut self, id: FilterId) -> bool {
        if !self.filters.contains_key(&id) {
            return false;
        }

        self.drop_filter(id);
        self.order.remove(id);
        self.listeners.notify_list_changed();

        true
    }

    /// Apply an explicit order covering every filter.
    ///
    /// Returns `false` if the vector is not a permutation of the current
    /// ids, in which case nothing changed and the caller should force a
    /// reload.
    #[instrument(skip_all, fields(count = order.len()))]
    pub fn apply_order(&mut self, order: &[FilterId]) -> bool {
        match reconcile::apply_order(&mut self.order, order) {
            None => {
                warn!(current = ?self.order.as_slice(), ?order, "Rejecting a filter order");
                false
            }
            Some(moved) => {
                if moved {
                    debug!(?order, "Applied a new filter order");
                    self.listeners.notify_list_changed();
                }
                true
            }
        }
    }

    /// Replace the pinned conversations of a filter.
    ///
    /// New pins are added to the always-included set; pins beyond the
    /// configured limit are dropped. Returns the updated filter, or `None` if
    /// the filter is unknown.
    pub fn apply_updated_pinned(
        &mut self,
        id: FilterId,
        pinned: &[ConversationId],
    ) -> Option<&FilterEntity> {
        let updated = self
            .filters
            .get(&id)?
            .clone()
            .with_pinned(pinned.iter().copied(), self.config.pinned_limit);

        self.set(updated);
        self.filters.get(&id)
    }

    /// Re-evaluate one conversation against every filter, after its
    /// attributes changed. Returns whether any membership changed.
    #[instrument(skip(self))]
    pub fn conversation_changed(&mut self, conversation_id: ConversationId) -> bool {
        let evaluator = MembershipEvaluator::new(&*self.registry);
        let tracked = self.config.scan_archived || !self.registry.is_archived(conversation_id);
        let mut changed = false;

        for id in self.order.as_slice() {
            let (Some(filter), Some(index)) = (self.filters.get(id), self.indices.get_mut(id))
            else {
                continue;
            };

            let is_member = tracked && evaluator.contains(filter, conversation_id);
            let flipped = if is_member {
                index.insert(conversation_id)
            } else {
                index.remove(conversation_id)
            };

            if flipped {
                self.listeners.notify_membership_changed(*id, conversation_id, is_member);
                changed = true;
            }
        }

        if changed {
            self.listeners.notify_list_changed();
        }

        changed
    }

    /// Drop a conversation that no longer exists from every index.
    #[instrument(skip(self))]
    pub fn conversation_removed(&mut self, conversation_id: ConversationId) -> bool {
        let mut changed = false;

        for id in self.order.as_slice() {
            if let Some(index) = self.indices.get_mut(id)
                && index.remove(conversation_id)
            {
                self.listeners.notify_membership_changed(*id, conversation_id, false);
                changed = true;
            }
        }

        if changed {
            self.listeners.notify_list_changed();
        }

        changed
    }

    /// Store a filter unknown so far: it starts out as an empty placeholder
    /// with an empty index, and `candidate` is applied on top of it.
    fn insert_new(&mut self, candidate: FilterEntity) {
        let id = candidate.id();

        debug!(%id, title = candidate.title(), "Inserting a filter");

        self.filters.insert(id, FilterEntity::placeholder(id));
        self.indices.insert(id, ChatListIndex::new(id));
        self.apply_change(candidate);
    }

    /// Clear the membership of a filter and forget it. The caller takes care
    /// of the order.
    fn drop_filter(&mut self, id: FilterId) {
        debug!(%id, "Removing a filter");

        self.apply_change(FilterEntity::placeholder(id));
        self.filters.remove(&id);
        self.indices.remove(&id);
    }

    /// Replace a stored filter with `candidate`, updating its index.
    ///
    /// Returns `false`, leaving everything untouched, if `candidate` equals
    /// the stored filter.
    fn apply_change(&mut self, candidate: FilterEntity) -> bool {
        let id = candidate.id();
        let Some(previous) = self.filters.get(&id) else {
            return false;
        };

        let rules_changed = previous.rules_differ(&candidate);
        let pinned_changed = previous.pinned() != candidate.pinned();

        if !rules_changed && !pinned_changed && previous.title() == candidate.title() {
            return false;
        }

        let index = self.indices.entry(id).or_insert_with(|| ChatListIndex::new(id));

        if rules_changed {
            let evaluator = MembershipEvaluator::new(&*self.registry);
            let mut joined = 0usize;
            let mut left = 0usize;

            for conversation_id in known_conversations(&*self.registry, self.config.scan_archived) {
                let was_member = evaluator.contains(previous, conversation_id);
                let is_member = evaluator.contains(&candidate, conversation_id);

                if was_member == is_member {
                    continue;
                }

                let flipped = if is_member {
                    index.insert(conversation_id)
                } else {
                    index.remove(conversation_id)
                };

                if flipped {
                    if is_member {
                        joined += 1;
                    } else {
                        left += 1;
                    }
                    self.listeners.notify_membership_changed(id, conversation_id, is_member);
                }
            }

            debug!(%id, joined, left, "Filter rules changed");
        }

        if pinned_changed {
            index.set_pinned(candidate.pinned(), self.config.pinned_limit);
        }

        self.filters.insert(id, candidate);
        true
    }
}

/// Every conversation a full membership scan visits.
fn known_conversations(
    registry: &dyn ConversationRegistry,
    scan_archived: bool,
) -> Vec<ConversationId> {
    let mut conversations = registry.conversations();

    if scan_archived && let Some(archived) = registry.archived_conversations() {
        conversations.extend(archived);
    }

    conversations
}
