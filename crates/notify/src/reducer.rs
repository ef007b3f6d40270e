use leafswap_types::{Swap, SwapEvent, SwapEventKind};

use crate::subscription::FeedEvent;

/// Fold one committed event into a cached swap list.
///
/// Pure upsert/delete semantics so the same event applied twice leaves the
/// list unchanged, which makes at-least-once redelivery safe. New records
/// are inserted at the front to preserve newest-first presentation order;
/// updates replace in place so the caller's ordering survives.
pub fn apply(mut swaps: Vec<Swap>, event: &SwapEvent) -> Vec<Swap> {
    match event.kind {
        SwapEventKind::Created | SwapEventKind::Updated => {
            match swaps.iter_mut().find(|s| s.id == event.swap.id) {
                Some(existing) => *existing = event.swap.clone(),
                None => swaps.insert(0, event.swap.clone()),
            }
        }
        SwapEventKind::Deleted => swaps.retain(|s| s.id != event.swap.id),
    }
    swaps
}

/// Fold a batch of events in delivery order.
pub fn apply_all<'a>(
    swaps: Vec<Swap>,
    events: impl IntoIterator<Item = &'a SwapEvent>,
) -> Vec<Swap> {
    events.into_iter().fold(swaps, apply)
}

/// Fold one feed delivery into a cached swap list.
///
/// A [`FeedEvent::Lagged`] gap cannot be folded because the evicted events
/// are gone; the stale list is returned unchanged and the returned flag is
/// set so the caller knows to re-list from the store.
pub fn apply_feed(swaps: Vec<Swap>, delivery: &FeedEvent) -> (Vec<Swap>, bool) {
    match delivery {
        FeedEvent::Swap(event) => (apply(swaps, event), false),
        FeedEvent::Lagged { .. } => (swaps, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafswap_types::SwapStatus;

    fn make_test_swap(id: &str) -> Swap {
        Swap::new(id, "alice", "bob", "plant-a", "plant-b", None, 1_700_000_000)
    }

    #[test]
    fn test_created_inserts_at_front() {
        let list = apply(vec![make_test_swap("swap-1")], &SwapEvent::created(make_test_swap("swap-2")));

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "swap-2");
        assert_eq!(list[1].id, "swap-1");
    }

    #[test]
    fn test_updated_replaces_in_place() {
        let mut updated = make_test_swap("swap-1");
        updated.status = SwapStatus::Accepted;

        let list = apply(
            vec![make_test_swap("swap-0"), make_test_swap("swap-1")],
            &SwapEvent::updated(updated),
        );

        assert_eq!(list.len(), 2);
        assert_eq!(list[1].id, "swap-1");
        assert_eq!(list[1].status, SwapStatus::Accepted);
    }

    #[test]
    fn test_updated_for_unknown_swap_inserts() {
        // An update can arrive before the consumer's first snapshot
        // includes the record. Upsert keeps the view converging.
        let list = apply(Vec::new(), &SwapEvent::updated(make_test_swap("swap-1")));
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "swap-1");
    }

    #[test]
    fn test_deleted_removes_record() {
        let list = apply(
            vec![make_test_swap("swap-1"), make_test_swap("swap-2")],
            &SwapEvent::deleted(make_test_swap("swap-1")),
        );

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "swap-2");
    }

    #[test]
    fn test_deleted_for_unknown_swap_is_noop() {
        let list = apply(
            vec![make_test_swap("swap-1")],
            &SwapEvent::deleted(make_test_swap("swap-9")),
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_redelivery_is_idempotent() {
        let event = SwapEvent::created(make_test_swap("swap-1"));

        let once = apply(Vec::new(), &event);
        let twice = apply(once.clone(), &event);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_all_folds_in_delivery_order() {
        let mut accepted = make_test_swap("swap-1");
        accepted.status = SwapStatus::Accepted;

        let events = vec![
            SwapEvent::created(make_test_swap("swap-1")),
            SwapEvent::created(make_test_swap("swap-2")),
            SwapEvent::updated(accepted),
        ];

        let list = apply_all(Vec::new(), &events);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, "swap-2");
        assert_eq!(list[1].id, "swap-1");
        assert_eq!(list[1].status, SwapStatus::Accepted);
    }

    #[test]
    fn test_lag_flags_resync_without_touching_list() {
        let list = vec![make_test_swap("swap-1")];

        let (after, resync) = apply_feed(list.clone(), &FeedEvent::Lagged { missed: 7 });
        assert!(resync);
        assert_eq!(after, list);

        let (after, resync) = apply_feed(
            list,
            &FeedEvent::Swap(SwapEvent::created(make_test_swap("swap-2"))),
        );
        assert!(!resync);
        assert_eq!(after.len(), 2);
    }
}
