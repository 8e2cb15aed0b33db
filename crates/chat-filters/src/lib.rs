//! Saved chat filters, kept in sync with the server.
//!
//! A saved filter is a server-defined view over the user's conversations: a
//! set of conversation categories, exclusion rules, and explicit include,
//! exclude and pinned lists. This crate keeps the ordered list of filters in
//! the exact order the server declares, and maintains for every filter a
//! live index of the conversations it currently contains.
//!
//! The main entry point is [`FilterStore`]. It reads conversation attributes
//! through a [`ConversationRegistry`] provided by the embedder, reconciles
//! full lists and order vectors sent by the server, and updates the derived
//! indices incrementally whenever a filter's rules or a conversation's
//! attributes change. [`FilterSyncService`] drives the store from a
//! [`Transport`] and from [`FilterUpdate`]s pushed by the server.

mod config;
pub mod conversation;
mod error;
pub mod filter;
pub mod index;
mod listener;
pub mod membership;
mod pinned;
pub mod reconcile;
mod store;
pub mod sync;
pub mod update;

pub use config::{DEFAULT_PINNED_LIMIT, FilterStoreConfig};
pub use conversation::{
    ConversationId, ConversationInfo, ConversationKind, ConversationRegistry, FolderPlacement,
    InMemoryConversationRegistry,
};
pub use error::{ConfigError, Error, Result, TransportError};
pub use filter::{FilterEntity, FilterId, FilterWireEntry, PredicateFlags};
pub use index::ChatListIndex;
pub use listener::FilterListListener;
pub use membership::MembershipEvaluator;
pub use store::{FilterStore, LoadCompletion, LoadToken};
pub use sync::{FilterSyncService, Transport};
pub use update::{FilterUpdate, UpdateAction};
