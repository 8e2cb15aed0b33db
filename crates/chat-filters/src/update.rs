//! Push updates about filters sent by the server.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    filter::{FilterEntity, FilterId, FilterWireEntry},
    store::FilterStore,
};

/// An update pushed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterUpdate {
    /// A single filter was created, changed, or (without `filter`) removed.
    FilterChangedOrRemoved {
        id: FilterId,
        #[serde(default)]
        filter: Option<FilterWireEntry>,
    },
    /// The whole list is stale and must be fetched again.
    FiltersInvalidated,
    /// The filters were reordered.
    FilterOrderChanged { order: Vec<FilterId> },
}

impl FilterUpdate {
    /// Parse an update payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedUpdate`] if the payload is not a known
    /// update. That is a protocol violation with no defined recovery: callers
    /// must treat it as fatal. [`FilterSyncService::handle_payload`] panics on
    /// it.
    ///
    /// [`FilterSyncService::handle_payload`]: crate::FilterSyncService::handle_payload
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(Error::MalformedUpdate)
    }
}

/// What the caller of [`FilterStore::handle_update`] has to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateAction {
    /// The update was applied to the store.
    Applied,
    /// The store could not apply the update; force a full reload.
    Reload,
}

impl FilterStore {
    /// Route a push update to the matching store operation.
    ///
    /// # Panics
    ///
    /// Panics if a changed filter is sent under an id other than its own.
    pub fn handle_update(&mut self, update: FilterUpdate) -> UpdateAction {
        match update {
            FilterUpdate::FilterChangedOrRemoved { id, filter: Some(entry) } => {
                assert_eq!(entry.id, id, "filter update for {id} carries filter {}", entry.id);

                self.set(FilterEntity::from_wire(&entry, self.config().pinned_limit));
                UpdateAction::Applied
            }
            FilterUpdate::FilterChangedOrRemoved { id, filter: None } => {
                self.remove(id);
                UpdateAction::Applied
            }
            FilterUpdate::FiltersInvalidated => {
                debug!("The filter list was invalidated");
                UpdateAction::Reload
            }
            FilterUpdate::FilterOrderChanged { order } => {
                if self.apply_order(&order) {
                    UpdateAction::Applied
                } else {
                    UpdateAction::Reload
                }
            }
        }
    }
}
