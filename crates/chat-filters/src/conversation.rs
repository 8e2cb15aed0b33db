//! The read-only view of conversations this crate needs.
//!
//! Conversation storage lives outside of this crate. The filter engine only
//! queries it through [`ConversationRegistry`], which is handed to the
//! [`FilterStore`](crate::FilterStore) when it is created.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Serialize};

/// The stable identity of a conversation.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub u64);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for ConversationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The participant classification of a conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConversationKind {
    /// A one-to-one conversation with a bot account.
    Bot,
    /// A one-to-one conversation with someone in the contact list.
    Contact,
    /// A one-to-one conversation with someone outside the contact list.
    NonContact,
    /// A multi-member, non-broadcast conversation.
    Group,
    /// A broadcast conversation.
    Channel,
}

/// Synchronous access to conversation attributes.
pub trait ConversationRegistry: Send + Sync {
    /// The participant classification of the conversation.
    fn classify(&self, id: ConversationId) -> ConversationKind;

    /// Whether notifications of the conversation are muted.
    fn is_muted(&self, id: ConversationId) -> bool;

    /// Whether the conversation has unread mentions of the user.
    fn has_unread_mentions(&self, id: ConversationId) -> bool;

    /// Whether the folder the conversation lives in is known yet.
    fn folder_known(&self, id: ConversationId) -> bool;

    /// Whether the conversation lives in the archived folder.
    fn is_archived(&self, id: ConversationId) -> bool;

    /// The number of unread messages.
    fn unread_count(&self, id: ConversationId) -> u64;

    /// Whether the user explicitly marked the conversation as unread.
    fn has_unread_mark(&self, id: ConversationId) -> bool;

    /// All known conversations of the primary chat list.
    fn conversations(&self) -> Vec<ConversationId>;

    /// All known conversations of the archived folder, if the folder exists.
    fn archived_conversations(&self) -> Option<Vec<ConversationId>>;
}

/// Where a conversation is placed, as far as the client knows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FolderPlacement {
    /// The placement has not been received yet.
    #[default]
    Unknown,
    /// The conversation is in the primary chat list.
    Main,
    /// The conversation is in the archived folder.
    Archived,
}

/// The attributes [`InMemoryConversationRegistry`] keeps per conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationInfo {
    pub kind: ConversationKind,
    pub muted: bool,
    pub unread_mentions: bool,
    pub unread_count: u64,
    pub unread_mark: bool,
    pub folder: FolderPlacement,
}

impl ConversationInfo {
    /// A read, unmuted conversation of the given kind in the primary list.
    pub fn new(kind: ConversationKind) -> Self {
        Self {
            kind,
            muted: false,
            unread_mentions: false,
            unread_count: 0,
            unread_mark: false,
            folder: FolderPlacement::Main,
        }
    }

    pub fn muted(mut self) -> Self {
        self.muted = true;
        self
    }

    pub fn with_unread_mentions(mut self) -> Self {
        self.unread_mentions = true;
        self
    }

    pub fn with_unread_count(mut self, unread_count: u64) -> Self {
        self.unread_count = unread_count;
        self
    }

    pub fn marked_unread(mut self) -> Self {
        self.unread_mark = true;
        self
    }

    pub fn in_folder(mut self, folder: FolderPlacement) -> Self {
        self.folder = folder;
        self
    }
}

/// A [`ConversationRegistry`] backed by a map, for embedders that keep
/// conversation state in memory and for tests.
///
/// Unknown ids are reported as read, unmuted, non-contact conversations with
/// an unknown folder. The map only holds plain values, so a lock poisoned by
/// a panicking writer is still read and written.
#[derive(Debug, Default)]
pub struct InMemoryConversationRegistry {
    conversations: RwLock<BTreeMap<ConversationId, ConversationInfo>>,
}

impl InMemoryConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ConversationId, ConversationInfo>> {
        self.conversations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ConversationId, ConversationInfo>> {
        self.conversations.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace the attributes of a conversation.
    pub fn upsert(&self, id: ConversationId, info: ConversationInfo) {
        self.write().insert(id, info);
    }

    /// Modify the attributes of a known conversation in place.
    ///
    /// Returns `false` if the conversation is unknown.
    pub fn update(&self, id: ConversationId, f: impl FnOnce(&mut ConversationInfo)) -> bool {
        match self.write().get_mut(&id) {
            Some(info) => {
                f(info);
                true
            }
            None => false,
        }
    }

    /// Forget a conversation.
    pub fn remove(&self, id: ConversationId) -> Option<ConversationInfo> {
        self.write().remove(&id)
    }

    fn with_info<R>(
        &self,
        id: ConversationId,
        f: impl FnOnce(&ConversationInfo) -> R,
    ) -> Option<R> {
        self.read().get(&id).map(f)
    }

    fn ids_where(&self, predicate: impl Fn(&ConversationInfo) -> bool) -> Vec<ConversationId> {
        self.read().iter().filter(|(_, info)| predicate(info)).map(|(id, _)| *id).collect()
    }
}

impl ConversationRegistry for InMemoryConversationRegistry {
    fn classify(&self, id: ConversationId) -> ConversationKind {
        self.with_info(id, |info| info.kind).unwrap_or(ConversationKind::NonContact)
    }

    fn is_muted(&self, id: ConversationId) -> bool {
        self.with_info(id, |info| info.muted).unwrap_or_default()
    }

    fn has_unread_mentions(&self, id: ConversationId) -> bool {
        self.with_info(id, |info| info.unread_mentions).unwrap_or_default()
    }

    fn folder_known(&self, id: ConversationId) -> bool {
        self.with_info(id, |info| info.folder != FolderPlacement::Unknown).unwrap_or_default()
    }

    fn is_archived(&self, id: ConversationId) -> bool {
        self.with_info(id, |info| info.folder == FolderPlacement::Archived).unwrap_or_default()
    }

    fn unread_count(&self, id: ConversationId) -> u64 {
        self.with_info(id, |info| info.unread_count).unwrap_or_default()
    }

    fn has_unread_mark(&self, id: ConversationId) -> bool {
        self.with_info(id, |info| info.unread_mark).unwrap_or_default()
    }

    fn conversations(&self) -> Vec<ConversationId> {
        self.ids_where(|info| info.folder != FolderPlacement::Archived)
    }

    fn archived_conversations(&self) -> Option<Vec<ConversationId>> {
        Some(self.ids_where(|info| info.folder == FolderPlacement::Archived))
    }
}
