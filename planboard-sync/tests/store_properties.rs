//! Property-based tests for the store primitives and the position resolver.

use planboard_sync::{resolve_index, Extent, OrderedStore, ReorderRequest};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// A board with `sizes.len()` lists holding `sizes[i]` cards each
fn build_store(sizes: &[usize]) -> OrderedStore {
    let mut store = OrderedStore::new();
    store.add_board("b").unwrap();
    for (l, &cards) in sizes.iter().enumerate() {
        let list = format!("L{l}");
        store.add_list("b", list.as_str(), None).unwrap();
        for c in 0..cards {
            store
                .add_card(list.as_str(), format!("L{l}-c{c}").as_str(), None)
                .unwrap();
        }
    }
    store
}

/// Every container's order array plus every entry's parent
fn layout(store: &OrderedStore) -> (BTreeMap<String, Vec<String>>, BTreeMap<String, String>) {
    let orders = store
        .containers()
        .map(|c| {
            let order = c.order.iter().map(|e| e.as_str().to_string()).collect();
            (c.id.as_str().to_string(), order)
        })
        .collect();
    let parents = store
        .entries()
        .map(|e| (e.id.as_str().to_string(), e.parent.as_str().to_string()))
        .collect();
    (orders, parents)
}

/// Pick a request from raw seeds. Cards move between lists, lists within the
/// board; seeds that land on an empty list fall back to a list reorder.
fn pick_request(store: &OrderedStore, seeds: (usize, usize, usize, usize)) -> ReorderRequest {
    let (a, b, c, index) = seeds;
    let lists = store.order(&"b".into()).unwrap().to_vec();
    let source = lists[a % lists.len()].as_container();
    let cards = store.order(&source).unwrap();
    if cards.is_empty() {
        let list = &lists[b % lists.len()];
        return ReorderRequest::within(list.clone(), "b", index);
    }
    let card = cards[b % cards.len()].clone();
    let dest = lists[c % lists.len()].as_container();
    ReorderRequest::new(card, source, dest, index)
}

fn sizes_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..6, 1..5)
}

fn seeds_strategy() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (any::<usize>(), any::<usize>(), any::<usize>(), 0usize..10)
}

proptest! {
    #[test]
    fn test_primitives_preserve_invariants(
        sizes in sizes_strategy(),
        moves in prop::collection::vec(seeds_strategy(), 1..20),
    ) {
        let mut store = build_store(&sizes);
        let total: usize = sizes.iter().sum();

        for seeds in moves {
            let request = pick_request(&store, seeds);
            let landed = store.apply(&request).unwrap();
            prop_assert!(landed < store.order(&request.dest).unwrap().len());
            prop_assert_eq!(store.index_of(&request.entry), Some(landed));
            prop_assert!(store.check_invariants().is_ok());
        }

        // Cards are moved around, never lost or duplicated
        let cards: usize = store
            .order(&"b".into())
            .unwrap()
            .iter()
            .map(|list| store.order(&list.as_container()).unwrap().len())
            .sum();
        prop_assert_eq!(cards, total);
    }

    #[test]
    fn test_restore_is_exact_when_untouched(
        sizes in sizes_strategy(),
        seeds in seeds_strategy(),
    ) {
        let mut store = build_store(&sizes);
        let before = layout(&store);

        let request = pick_request(&store, seeds);
        let snapshot = store.snapshot(&request.scope()).unwrap();
        store.apply(&request).unwrap();
        store.restore(&snapshot);

        prop_assert_eq!(layout(&store), before);
        prop_assert!(store.check_invariants().is_ok());
    }

    #[test]
    fn test_resolver_stays_in_range(
        pointer in -1000.0f64..2000.0,
        lengths in prop::collection::vec(1.0f64..200.0, 0..12),
    ) {
        let mut start = 0.0;
        let siblings: Vec<Extent> = lengths
            .iter()
            .map(|&length| {
                let extent = Extent::new(start, length);
                start += length;
                extent
            })
            .collect();

        let index = resolve_index(pointer, &siblings);
        prop_assert!(index <= siblings.len());
        prop_assert_eq!(index, resolve_index(pointer, &siblings));
    }

    #[test]
    fn test_resolver_is_monotonic(
        a in -500.0f64..1500.0,
        b in -500.0f64..1500.0,
        count in 0usize..10,
    ) {
        let siblings: Vec<Extent> = (0..count)
            .map(|i| Extent::new(i as f64 * 100.0, 100.0))
            .collect();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(resolve_index(low, &siblings) <= resolve_index(high, &siblings));
    }
}
