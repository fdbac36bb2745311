// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for the harness's pure logic
//!
//! These tests use proptest to verify that:
//! 1. Namespace names from one allocator never repeat
//! 2. Events always end up ordered by their effective timestamp, stably
//! 3. Capability lookup and the run policy agree for any feature map

use std::collections::{HashMap, HashSet};

use k8s_openapi::api::core::v1::Event;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, Time};
use kube::core::ObjectMeta;
use proptest::prelude::*;

use eventing_e2e_harness::events::{effective_timestamp, sort_events};
use eventing_e2e_harness::{Capability, ComponentRef, ComponentsTestRunner, Feature, NamespaceAllocator};

// =============================================================================
// Strategies
// =============================================================================

/// An event with a sequence number as its name and one of the two
/// timestamp sources set (or neither)
fn arb_event(index: usize) -> impl Strategy<Value = Event> {
    (0u8..3, 0i64..50).prop_map(move |(source, second)| {
        let ts = chrono::DateTime::from_timestamp(second, 0).unwrap();
        Event {
            metadata: ObjectMeta {
                name: Some(index.to_string()),
                ..Default::default()
            },
            last_timestamp: (source == 0).then(|| Time(ts)),
            event_time: (source == 1).then(|| MicroTime(ts)),
            ..Default::default()
        }
    })
}

fn arb_events() -> impl Strategy<Value = Vec<Event>> {
    (0usize..30).prop_flat_map(|len| (0..len).map(arb_event).collect::<Vec<_>>())
}

fn arb_feature() -> impl Strategy<Value = Feature> {
    prop_oneof![
        Just(Feature::BASIC),
        Just(Feature::REDELIVERY),
        Just(Feature::PERSISTENCE),
        Just(Feature::STRICT_ORDERING),
    ]
}

fn arb_component() -> impl Strategy<Value = ComponentRef> {
    ("[A-D]", prop_oneof![Just("v1"), Just("v1beta1")])
        .prop_map(|(kind, version)| ComponentRef::new(kind, version))
}

// =============================================================================
// Namespace allocation
// =============================================================================

proptest! {
    #[test]
    fn allocator_never_repeats(base in "[a-z]{1,10}-", count in 1usize..200) {
        let allocator = NamespaceAllocator::new(base.clone());
        let names: Vec<_> = (0..count).map(|_| allocator.next_namespace()).collect();
        let unique: HashSet<_> = names.iter().collect();
        prop_assert_eq!(unique.len(), count);
        prop_assert!(names.iter().all(|n| n.starts_with(&base)));
        prop_assert_eq!(&names[0], &format!("{}0", base));
    }
}

// =============================================================================
// Event ordering
// =============================================================================

proptest! {
    #[test]
    fn sorted_events_are_ordered_and_stable(mut events in arb_events()) {
        sort_events(&mut events);

        for pair in events.windows(2) {
            let (a, b) = (effective_timestamp(&pair[0]), effective_timestamp(&pair[1]));
            prop_assert!(a <= b);
            if a == b {
                let ia: usize = pair[0].metadata.name.as_deref().unwrap().parse().unwrap();
                let ib: usize = pair[1].metadata.name.as_deref().unwrap().parse().unwrap();
                prop_assert!(ia < ib, "equal timestamps must keep input order");
            }
        }
    }

    #[test]
    fn sorting_is_idempotent(mut events in arb_events()) {
        sort_events(&mut events);
        let once: Vec<_> = events.iter().map(|e| e.metadata.name.clone()).collect();
        sort_events(&mut events);
        let twice: Vec<_> = events.iter().map(|e| e.metadata.name.clone()).collect();
        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// Capability matrix
// =============================================================================

proptest! {
    #[test]
    fn capability_matches_feature_map(
        map in prop::collection::hash_map(arb_component(), prop::collection::vec(arb_feature(), 0..4), 0..6),
        component in arb_component(),
        feature in arb_feature(),
        strict in any::<bool>(),
    ) {
        let runner = ComponentsTestRunner::new(map.clone(), vec![component.clone()]);
        let capability = runner.capability(&component, &feature);

        let expected = match map.get(&component) {
            None => Capability::Unregistered,
            Some(features) if features.contains(&feature) => Capability::Supported,
            Some(_) => Capability::Unsupported,
        };
        prop_assert_eq!(capability, expected);

        let runs = capability.should_run(strict);
        match capability {
            Capability::Supported => prop_assert!(runs),
            Capability::Unsupported => prop_assert!(!runs),
            Capability::Unregistered => prop_assert_eq!(runs, !strict),
        }

        let runs_with_options = capability.should_run_with_options(strict);
        prop_assert_eq!(runs_with_options, !strict || capability == Capability::Supported);
    }

    #[test]
    fn empty_map_runs_everything_unless_strict(feature in arb_feature(), strict in any::<bool>()) {
        let runner = ComponentsTestRunner::new(HashMap::new(), vec![]);
        let capability = runner.capability(&ComponentRef::new("A", "v1"), &feature);
        prop_assert_eq!(capability, Capability::Unregistered);
        prop_assert_eq!(capability.should_run(strict), !strict);
    }
}
