use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chat_filters::{
    ConversationId, ConversationInfo, ConversationKind, FilterEntity, FilterId,
    FilterListListener, FilterStore, FilterStoreConfig, FilterWireEntry, FolderPlacement,
    InMemoryConversationRegistry, MembershipEvaluator, PredicateFlags,
};
use proptest::prelude::*;

#[derive(Default)]
struct ChangeCounter(AtomicUsize);

impl ChangeCounter {
    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl FilterListListener for ChangeCounter {
    fn on_filter_list_changed(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn store_with(
    registry: Arc<InMemoryConversationRegistry>,
    pinned_limit: usize,
) -> (FilterStore, Arc<ChangeCounter>) {
    let mut store = FilterStore::new(FilterStoreConfig::with_pinned_limit(pinned_limit), registry)
        .expect("the config is valid");
    let counter = Arc::new(ChangeCounter::default());
    store.add_listener(&counter);
    (store, counter)
}

fn empty_store() -> (FilterStore, Arc<ChangeCounter>) {
    store_with(Arc::new(InMemoryConversationRegistry::new()), 10)
}

fn entries(ids: &[u32]) -> Vec<FilterWireEntry> {
    ids.iter().map(|id| FilterWireEntry::new(*id, format!("Filter {id}"))).collect()
}

fn filter_ids(ids: &[u32]) -> Vec<FilterId> {
    ids.iter().copied().map(FilterId).collect()
}

#[test]
fn test_load_into_an_empty_store() {
    let (mut store, counter) = empty_store();

    assert!(store.apply_full_list(&entries(&[1, 2])));

    assert_eq!(store.ids(), filter_ids(&[1, 2]).as_slice());
    assert_eq!(store.list().map(FilterEntity::title).collect::<Vec<_>>(), ["Filter 1", "Filter 2"]);
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_load_removes_and_reorders() {
    let (mut store, counter) = empty_store();
    store.apply_full_list(&entries(&[1, 2, 3]));

    assert!(store.apply_full_list(&entries(&[3, 1])));

    assert_eq!(store.ids(), filter_ids(&[3, 1]).as_slice());
    assert!(!store.has(FilterId(2)));
    assert!(store.index(FilterId(2)).is_none());
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_reloading_the_same_list_changes_nothing() {
    let (mut store, counter) = empty_store();
    store.apply_full_list(&entries(&[1, 2]));

    assert!(!store.apply_full_list(&entries(&[1, 2])));
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_load_updates_filters_in_place() {
    let registry = Arc::new(InMemoryConversationRegistry::new());
    registry.upsert(ConversationId(10), ConversationInfo::new(ConversationKind::Bot));
    let (mut store, counter) = store_with(registry, 10);
    store.apply_full_list(&entries(&[1]));

    let bots = FilterWireEntry { bots: true, ..FilterWireEntry::new(1, "Filter 1") };
    assert!(store.apply_full_list(&[bots]));

    assert!(store.contains(FilterId(1), ConversationId(10)));
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_empty_list_removes_everything() {
    let (mut store, _) = empty_store();
    store.apply_full_list(&entries(&[1, 2]));

    assert!(store.apply_full_list(&[]));
    assert!(store.ids().is_empty());
}

#[test]
fn test_order_equal_to_the_current_one_is_a_no_op() {
    let (mut store, counter) = empty_store();
    store.apply_full_list(&entries(&[1, 2, 3]));

    assert!(store.apply_order(&filter_ids(&[1, 2, 3])));
    assert_eq!(counter.get(), 1);

    assert!(store.apply_order(&filter_ids(&[2, 3, 1])));
    assert_eq!(store.ids(), filter_ids(&[2, 3, 1]).as_slice());
    assert_eq!(counter.get(), 2);
}

#[test]
fn test_invalid_orders_are_rejected() {
    let (mut store, counter) = empty_store();
    store.apply_full_list(&entries(&[1, 2, 3]));

    assert!(!store.apply_order(&filter_ids(&[1, 2])));
    assert!(!store.apply_order(&filter_ids(&[1, 2, 3, 4])));
    assert!(!store.apply_order(&filter_ids(&[3, 2, 4])));

    assert_eq!(store.ids(), filter_ids(&[1, 2, 3]).as_slice());
    assert_eq!(counter.get(), 1);
}

#[test]
fn test_muted_group_with_a_mention() {
    let group = ConversationId(7);
    let registry = Arc::new(InMemoryConversationRegistry::new());
    registry.upsert(group, ConversationInfo::new(ConversationKind::Group).muted());
    let (mut store, _) = store_with(registry.clone(), 10);

    let filter = FilterEntity::new(FilterId(1), "Groups")
        .with_flags(PredicateFlags::GROUPS | PredicateFlags::EXCLUDE_MUTED);
    assert!(!MembershipEvaluator::new(registry.as_ref()).contains(&filter, group));

    store.set(filter.clone());
    assert!(!store.contains(FilterId(1), group));

    registry.update(group, |info| info.unread_mentions = true);
    assert!(MembershipEvaluator::new(registry.as_ref()).contains(&filter, group));

    assert!(store.conversation_changed(group));
    assert!(store.contains(FilterId(1), group));
}

#[test]
fn test_updated_pinned_drops_pins_past_the_limit() {
    let registry = Arc::new(InMemoryConversationRegistry::new());
    for id in 1..=3 {
        registry.upsert(ConversationId(id), ConversationInfo::new(ConversationKind::Channel));
    }
    let (mut store, _) = store_with(registry, 2);
    store.set(FilterEntity::new(FilterId(4), "Channels"));

    let (a, b, c) = (ConversationId(1), ConversationId(2), ConversationId(3));
    let filter = store.apply_updated_pinned(FilterId(4), &[a, b, c]).expect("the filter exists");

    assert_eq!(filter.pinned(), &[a, b]);
    assert!(filter.always().contains(&a));
    assert!(filter.always().contains(&b));
    assert!(!filter.always().contains(&c));

    let index = store.index(FilterId(4)).expect("the index exists");
    assert_eq!(index.pinned(), vec![a, b]);
}

#[test]
fn test_unknown_folder_fails_exclude_archived() {
    let registry = Arc::new(InMemoryConversationRegistry::new());
    registry.upsert(
        ConversationId(1),
        ConversationInfo::new(ConversationKind::Contact).in_folder(FolderPlacement::Unknown),
    );
    registry.upsert(ConversationId(2), ConversationInfo::new(ConversationKind::Contact));
    let (mut store, _) = store_with(registry, 10);

    store.set(
        FilterEntity::new(FilterId(1), "Contacts")
            .with_flags(PredicateFlags::CONTACTS | PredicateFlags::EXCLUDE_ARCHIVED),
    );

    assert_eq!(store.filters_containing(ConversationId(1)), Vec::<FilterId>::new());
    assert_eq!(store.filters_containing(ConversationId(2)), vec![FilterId(1)]);
}

const CONVERSATIONS: u64 = 6;

fn conversation_info() -> impl Strategy<Value = ConversationInfo> {
    let kind = prop_oneof![
        Just(ConversationKind::Bot),
        Just(ConversationKind::Contact),
        Just(ConversationKind::NonContact),
        Just(ConversationKind::Group),
        Just(ConversationKind::Channel),
    ];
    let folder = prop_oneof![
        Just(FolderPlacement::Unknown),
        Just(FolderPlacement::Main),
        Just(FolderPlacement::Archived),
    ];

    (kind, any::<bool>(), any::<bool>(), 0u64..3, any::<bool>(), folder).prop_map(
        |(kind, muted, unread_mentions, unread_count, unread_mark, folder)| ConversationInfo {
            kind,
            muted,
            unread_mentions,
            unread_count,
            unread_mark,
            folder,
        },
    )
}

fn registry() -> impl Strategy<Value = Arc<InMemoryConversationRegistry>> {
    prop::collection::vec(conversation_info(), CONVERSATIONS as usize).prop_map(|infos| {
        let registry = InMemoryConversationRegistry::new();
        for (id, info) in (1..).zip(infos) {
            registry.upsert(ConversationId(id), info);
        }
        Arc::new(registry)
    })
}

fn conversation_ids() -> impl Strategy<Value = Vec<ConversationId>> {
    prop::collection::vec((1..=CONVERSATIONS).prop_map(ConversationId), 0..4)
}

fn flags() -> impl Strategy<Value = PredicateFlags> {
    any::<u8>().prop_map(PredicateFlags::from_bits_truncate)
}

fn first_occurrences(ids: &[u32]) -> Vec<FilterId> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&FilterId(*id)) {
            seen.push(FilterId(*id));
        }
    }
    seen
}

proptest! {
    #[test]
    fn test_load_mirrors_the_server_order(
        initial in prop::collection::vec(1u32..12, 0..8),
        authoritative in prop::collection::vec(1u32..12, 0..8),
    ) {
        let (mut store, _) = empty_store();
        store.apply_full_list(&entries(&initial));
        prop_assert_eq!(store.ids().to_vec(), first_occurrences(&initial));

        store.apply_full_list(&entries(&authoritative));
        prop_assert_eq!(store.ids().to_vec(), first_occurrences(&authoritative));
    }

    #[test]
    fn test_permutations_are_accepted_and_others_rejected(
        (current, permutation) in prop::collection::hash_set(1u32..50, 1..8)
            .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
            .prop_flat_map(|ids| (Just(ids.clone()), Just(ids).prop_shuffle())),
    ) {
        let (mut store, _) = empty_store();
        store.apply_full_list(&entries(&current));
        let current = filter_ids(&current);

        let mut missing = filter_ids(&permutation);
        missing.pop();
        prop_assert!(!store.apply_order(&missing));
        prop_assert_eq!(store.ids().to_vec(), current.clone());

        let mut extra = filter_ids(&permutation);
        extra.push(FilterId(100));
        prop_assert!(!store.apply_order(&extra));
        prop_assert_eq!(store.ids().to_vec(), current);

        let permutation = filter_ids(&permutation);
        prop_assert!(store.apply_order(&permutation));
        prop_assert_eq!(store.ids().to_vec(), permutation);
    }

    #[test]
    fn test_pinned_stays_within_always_and_the_limit(
        pins in prop::collection::vec(1u64..20, 0..12),
        limit in 1usize..6,
    ) {
        let (mut store, _) = store_with(Arc::new(InMemoryConversationRegistry::new()), limit);
        store.set(FilterEntity::new(FilterId(1), "Pinned"));

        let pins: Vec<_> = pins.into_iter().map(ConversationId).collect();
        let filter = store.apply_updated_pinned(FilterId(1), &pins).expect("the filter exists");

        prop_assert!(filter.pinned().len() <= limit);
        prop_assert!(filter.pinned().iter().all(|id| filter.always().contains(id)));
    }

    #[test]
    fn test_never_excludes_regardless_of_the_rest(
        registry in registry(),
        flags in flags(),
        always in conversation_ids(),
        never in conversation_ids(),
    ) {
        let filter = FilterEntity::new(FilterId(1), "Never")
            .with_flags(flags)
            .with_always(always)
            .with_never(never.clone());
        let evaluator = MembershipEvaluator::new(registry.as_ref());

        for conversation in never {
            prop_assert!(!evaluator.contains(&filter, conversation));
        }
    }

    #[test]
    fn test_always_includes_regardless_of_the_predicate(
        registry in registry(),
        flags in flags(),
        always in conversation_ids(),
        never in conversation_ids(),
    ) {
        let filter = FilterEntity::new(FilterId(1), "Always")
            .with_flags(flags)
            .with_always(always.clone())
            .with_never(never.clone());
        let evaluator = MembershipEvaluator::new(registry.as_ref());

        for conversation in always.into_iter().filter(|id| !never.contains(id)) {
            prop_assert!(evaluator.contains(&filter, conversation));
        }
    }

    #[test]
    fn test_setting_the_same_filter_twice_changes_nothing(
        registry in registry(),
        flags in flags(),
        always in conversation_ids(),
        never in conversation_ids(),
        pinned in conversation_ids(),
    ) {
        let (mut store, counter) = store_with(registry, 2);
        let filter = FilterEntity::new(FilterId(1), "Twice")
            .with_flags(flags)
            .with_always(always)
            .with_never(never)
            .with_pinned(pinned, 5);

        prop_assert!(store.set(filter.clone()));
        let members = store.index(FilterId(1)).map(|index| index.entries());
        let notified = counter.get();

        prop_assert!(!store.set(filter));
        prop_assert_eq!(counter.get(), notified);
        prop_assert_eq!(store.index(FilterId(1)).map(|index| index.entries()), members);
    }
}
