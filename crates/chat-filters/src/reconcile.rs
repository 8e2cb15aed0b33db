//! Bringing the local filter order in line with the server's.
//!
//! Filters themselves live in an id-keyed arena owned by the store; this
//! module only ever moves ids around in a [`FilterOrder`], so reordering never
//! copies a filter.

use std::collections::HashSet;

use crate::filter::FilterId;

/// The ordered list of filter ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterOrder {
    ids: Vec<FilterId>,
}

impl FilterOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[FilterId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn push(&mut self, id: FilterId) {
        self.ids.push(id);
    }

    pub(crate) fn remove(&mut self, id: FilterId) -> bool {
        match self.ids.iter().position(|candidate| *candidate == id) {
            Some(position) => {
                self.ids.remove(position);
                true
            }
            None => false,
        }
    }
}

impl From<Vec<FilterId>> for FilterOrder {
    fn from(ids: Vec<FilterId>) -> Self {
        Self { ids }
    }
}

/// One operation of a full-list reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileStep {
    /// A filter unknown locally was inserted at `position`.
    Insert { id: FilterId, position: usize },
    /// A filter already at `position` is kept there, its configuration may
    /// still need an update.
    Keep { id: FilterId, position: usize },
    /// A filter was found at `from` and swapped into `to`.
    Swap { id: FilterId, from: usize, to: usize },
    /// A filter missing from the authoritative list was removed.
    Remove { id: FilterId },
}

impl ReconcileStep {
    /// Whether the step changed the order on its own, regardless of any
    /// configuration update.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Keep { .. })
    }
}

/// Reorder `order` so it holds exactly the ids of `authoritative`, in the
/// same order, and return the steps that got it there.
///
/// A single left-to-right pass: each authoritative id is looked up in the
/// not yet settled suffix of `order`, then inserted or swapped into place.
/// Whatever remains past the settled prefix is removed. An id repeated in
/// `authoritative` only counts the first time.
pub fn sync_full_list(order: &mut FilterOrder, authoritative: &[FilterId]) -> Vec<ReconcileStep> {
    let mut steps = Vec::with_capacity(authoritative.len());
    let mut seen = HashSet::with_capacity(authoritative.len());
    let mut position = 0;

    for id in authoritative.iter().copied() {
        if !seen.insert(id) {
            continue;
        }

        let found = order.ids[position..].iter().position(|candidate| *candidate == id);

        match found {
            None => {
                order.ids.insert(position, id);
                steps.push(ReconcileStep::Insert { id, position });
            }
            Some(0) => steps.push(ReconcileStep::Keep { id, position }),
            Some(offset) => {
                let from = position + offset;
                order.ids.swap(position, from);
                steps.push(ReconcileStep::Swap { id, from, to: position });
            }
        }

        position += 1;
    }

    steps.extend(order.ids.drain(position..).map(|id| ReconcileStep::Remove { id }));

    steps
}

/// Run the swap sequence that brings `ids` into the order of `incoming`.
///
/// Returns `None` as soon as an id of `incoming` is not found in the
/// remaining suffix, otherwise whether any swap moved an id.
fn swap_into_order(ids: &mut [FilterId], incoming: &[FilterId]) -> Option<bool> {
    let mut moved = false;

    for (position, id) in incoming.iter().enumerate() {
        let offset = ids[position..].iter().position(|candidate| candidate == id)?;

        if offset != 0 {
            ids.swap(position, position + offset);
            moved = true;
        }
    }

    Some(moved)
}

/// Check that `incoming` is a permutation of the ids in `order`.
pub fn validate_order(order: &FilterOrder, incoming: &[FilterId]) -> bool {
    if incoming.len() != order.len() {
        return false;
    }

    let mut scratch = order.ids.clone();
    swap_into_order(&mut scratch, incoming).is_some()
}

/// Apply an explicit order vector covering every local filter.
///
/// The vector is validated against a scratch copy first, so `order` is left
/// untouched when it is rejected. Returns `None` on rejection, otherwise
/// whether the order actually changed.
pub fn apply_order(order: &mut FilterOrder, incoming: &[FilterId]) -> Option<bool> {
    if !validate_order(order, incoming) {
        return None;
    }

    swap_into_order(&mut order.ids, incoming)
}
