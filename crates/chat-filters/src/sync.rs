//! Driving full-list loads over a [`Transport`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::{Mutex, MutexGuard},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    error::TransportError,
    filter::FilterWireEntry,
    store::{FilterStore, LoadCompletion},
    update::{FilterUpdate, UpdateAction},
};

/// Fetches the authoritative filter list from the server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Request the full, ordered filter list.
    async fn request_full_list(&self) -> Result<Vec<FilterWireEntry>, TransportError>;
}

/// Owns a [`FilterStore`] and keeps it in sync with the server.
///
/// At most one load is in flight: a forced load aborts the task of the
/// previous one, and a completion that still slips through is discarded by
/// the store because its token is stale.
pub struct FilterSyncService<T: Transport> {
    store: Arc<Mutex<FilterStore>>,
    transport: Arc<T>,
    in_flight: Mutex<Option<JoinHandle<LoadCompletion>>>,
}

impl<T: Transport> FilterSyncService<T> {
    pub fn new(store: FilterStore, transport: T) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            transport: Arc::new(transport),
            in_flight: Mutex::new(None),
        }
    }

    /// Lock the store to read it or to apply local changes.
    pub async fn store(&self) -> MutexGuard<'_, FilterStore> {
        self.store.lock().await
    }

    /// Request the full filter list.
    ///
    /// Does nothing and returns `false` if a load is already in flight and
    /// `force` is not set.
    pub async fn load(&self, force: bool) -> bool {
        let mut in_flight = self.in_flight.lock().await;

        let Some(token) = self.store.lock().await.begin_load(force) else {
            return false;
        };

        if let Some(previous) = in_flight.take() {
            debug!("Aborting the superseded filter list request");
            previous.abort();
        }

        let store = self.store.clone();
        let transport = self.transport.clone();

        *in_flight = Some(tokio::spawn(async move {
            let response = transport.request_full_list().await;
            store.lock().await.finish_load(token, response)
        }));

        true
    }

    /// Wait for the in-flight load, if any, to complete.
    ///
    /// Returns `None` if there was nothing to wait for or the load was
    /// aborted.
    pub async fn wait_for_load(&self) -> Option<LoadCompletion> {
        let handle = self.in_flight.lock().await.take()?;

        match handle.await {
            Ok(completion) => Some(completion),
            Err(error) => {
                if !error.is_cancelled() {
                    warn!(%error, "The filter list request task failed");
                }
                None
            }
        }
    }

    /// Parse and apply a raw push update.
    ///
    /// # Panics
    ///
    /// Panics if the payload is not a known update, or if a changed filter
    /// is sent under an id other than its own.
    pub async fn handle_payload(&self, payload: &str) -> UpdateAction {
        let update = match FilterUpdate::from_json(payload) {
            Ok(update) => update,
            Err(error) => panic!("received a malformed filter update: {error}"),
        };

        self.handle_update(update).await
    }

    /// Apply a push update, reloading the full list when the store asks for
    /// it.
    pub async fn handle_update(&self, update: FilterUpdate) -> UpdateAction {
        let action = self.store.lock().await.handle_update(update);

        if action == UpdateAction::Reload {
            self.load(true).await;
        }

        action
    }
}
