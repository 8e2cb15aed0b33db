//! The value type describing one saved filter.

use std::{collections::BTreeSet, fmt};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{conversation::ConversationId, pinned};

/// The server-assigned identity of a filter. `0` is never a valid id.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterId(pub u32);

impl FilterId {
    /// Whether this id may be used for a stored filter.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

bitflags! {
    /// Conversation categories a filter selects, and the exclusion rules it
    /// applies on top of them.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PredicateFlags: u8 {
        const CONTACTS = 1 << 0;
        const NON_CONTACTS = 1 << 1;
        const GROUPS = 1 << 2;
        const CHANNELS = 1 << 3;
        const BOTS = 1 << 4;
        const EXCLUDE_MUTED = 1 << 5;
        const EXCLUDE_READ = 1 << 6;
        const EXCLUDE_ARCHIVED = 1 << 7;

        const CATEGORIES = Self::CONTACTS.bits()
            | Self::NON_CONTACTS.bits()
            | Self::GROUPS.bits()
            | Self::CHANNELS.bits()
            | Self::BOTS.bits();
    }
}

/// One saved filter.
///
/// A `FilterEntity` is never mutated once it is stored: changes are made by
/// building a new value with the `with_*` methods and handing it to the
/// store, which diffs it against the stored one and swaps it in.
///
/// Every pinned conversation is also part of [`FilterEntity::always`], and
/// there are never more pinned entries than the limit the value was built
/// with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterEntity {
    id: FilterId,
    title: String,
    flags: PredicateFlags,
    always: BTreeSet<ConversationId>,
    never: BTreeSet<ConversationId>,
    pinned: Vec<ConversationId>,
}

impl FilterEntity {
    /// Create a filter without any rules.
    pub fn new(id: FilterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            flags: PredicateFlags::empty(),
            always: BTreeSet::new(),
            never: BTreeSet::new(),
            pinned: Vec::new(),
        }
    }

    /// The empty filter a new or removed filter is diffed against.
    pub(crate) fn placeholder(id: FilterId) -> Self {
        Self::new(id, String::new())
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn flags(&self) -> PredicateFlags {
        self.flags
    }

    /// Conversations included regardless of the flags.
    pub fn always(&self) -> &BTreeSet<ConversationId> {
        &self.always
    }

    /// Conversations excluded regardless of everything else.
    pub fn never(&self) -> &BTreeSet<ConversationId> {
        &self.never
    }

    /// Conversations surfaced first, in order.
    pub fn pinned(&self) -> &[ConversationId] {
        &self.pinned
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_flags(mut self, flags: PredicateFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace the always-included set.
    ///
    /// Pinned conversations stay part of the set even if `always` omits them.
    pub fn with_always(mut self, always: impl IntoIterator<Item = ConversationId>) -> Self {
        self.always = always.into_iter().collect();
        self.always.extend(self.pinned.iter().copied());
        self
    }

    pub fn with_never(mut self, never: impl IntoIterator<Item = ConversationId>) -> Self {
        self.never = never.into_iter().collect();
        self
    }

    /// Replace the pinned sequence, adding the pinned conversations to the
    /// always-included set. Duplicates are skipped and requests beyond
    /// `pinned_limit` are dropped.
    pub fn with_pinned(
        mut self,
        pinned: impl IntoIterator<Item = ConversationId>,
        pinned_limit: usize,
    ) -> Self {
        self.pinned = pinned::bounded(pinned, pinned_limit);
        self.always.extend(self.pinned.iter().copied());
        self
    }

    /// Whether the rules deciding membership differ between the two values.
    pub fn rules_differ(&self, other: &Self) -> bool {
        self.flags != other.flags || self.always != other.always || self.never != other.never
    }

    /// Build a filter out of its wire representation.
    ///
    /// Pinned conversations are merged into the always-included set, and pins
    /// beyond `pinned_limit` are dropped.
    pub fn from_wire(entry: &FilterWireEntry, pinned_limit: usize) -> Self {
        let mut flags = PredicateFlags::empty();
        flags.set(PredicateFlags::CONTACTS, entry.contacts);
        flags.set(PredicateFlags::NON_CONTACTS, entry.non_contacts);
        flags.set(PredicateFlags::GROUPS, entry.groups);
        flags.set(PredicateFlags::CHANNELS, entry.channels);
        flags.set(PredicateFlags::BOTS, entry.bots);
        flags.set(PredicateFlags::EXCLUDE_MUTED, entry.exclude_muted);
        flags.set(PredicateFlags::EXCLUDE_READ, entry.exclude_read);
        flags.set(PredicateFlags::EXCLUDE_ARCHIVED, entry.exclude_archived);

        Self::new(entry.id, entry.title.clone())
            .with_flags(flags)
            .with_always(entry.include.iter().copied())
            .with_never(entry.exclude.iter().copied())
            .with_pinned(entry.pinned.iter().copied(), pinned_limit)
    }

    /// The wire representation of this filter. Pinned conversations are not
    /// repeated in the `include` list.
    pub fn to_wire(&self) -> FilterWireEntry {
        FilterWireEntry {
            id: self.id,
            title: self.title.clone(),
            contacts: self.flags.contains(PredicateFlags::CONTACTS),
            non_contacts: self.flags.contains(PredicateFlags::NON_CONTACTS),
            groups: self.flags.contains(PredicateFlags::GROUPS),
            channels: self.flags.contains(PredicateFlags::CHANNELS),
            bots: self.flags.contains(PredicateFlags::BOTS),
            exclude_muted: self.flags.contains(PredicateFlags::EXCLUDE_MUTED),
            exclude_read: self.flags.contains(PredicateFlags::EXCLUDE_READ),
            exclude_archived: self.flags.contains(PredicateFlags::EXCLUDE_ARCHIVED),
            pinned: self.pinned.clone(),
            include: self.always.iter().filter(|id| !self.pinned.contains(id)).copied().collect(),
            exclude: self.never.iter().copied().collect(),
        }
    }
}

/// A filter as the server sends it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterWireEntry {
    pub id: FilterId,
    pub title: String,
    #[serde(default)]
    pub contacts: bool,
    #[serde(default)]
    pub non_contacts: bool,
    #[serde(default)]
    pub groups: bool,
    #[serde(default)]
    pub channels: bool,
    #[serde(default)]
    pub bots: bool,
    #[serde(default)]
    pub exclude_muted: bool,
    #[serde(default)]
    pub exclude_read: bool,
    #[serde(default)]
    pub exclude_archived: bool,
    #[serde(default)]
    pub pinned: Vec<ConversationId>,
    #[serde(default)]
    pub include: Vec<ConversationId>,
    #[serde(default)]
    pub exclude: Vec<ConversationId>,
}

impl FilterWireEntry {
    /// An entry without any rules.
    pub fn new(id: u32, title: impl Into<String>) -> Self {
        Self { id: FilterId(id), title: title.into(), ..Default::default() }
    }
}
