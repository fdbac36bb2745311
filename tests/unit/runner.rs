//! Unit tests for the component capability matrix

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use eventing_e2e_harness::{
    ComponentRef, ComponentsTestRunner, Feature, Harness, SetupClientOption, TestHandle,
    TestOutcome, TestSession,
};

use crate::common::{FakeCluster, fast_config};

const CHANNEL_API: &str = "messaging.knative.dev/v1";

fn in_memory() -> ComponentRef {
    ComponentRef::new("InMemoryChannel", CHANNEL_API)
}

fn kafka() -> ComponentRef {
    ComponentRef::new("KafkaChannel", "messaging.knative.dev/v1beta1")
}

fn runner() -> ComponentsTestRunner {
    ComponentsTestRunner::new(
        HashMap::from([(
            in_memory(),
            vec![Feature::BASIC, Feature::REDELIVERY],
        )]),
        vec![in_memory(), kafka()],
    )
}

fn outcomes(t: &TestHandle) -> Vec<(String, TestOutcome)> {
    t.subtests()
        .into_iter()
        .map(|st| (st.name().to_string(), st.outcome()))
        .collect()
}

#[tokio::test]
async fn test_matrix_runs_supported_and_unregistered() {
    let runner = runner();
    let t = TestHandle::new("TestChannelBasic");

    runner
        .run_tests(&t, &Feature::BASIC, |_st, _component| async {})
        .await;

    assert_eq!(
        outcomes(&t),
        vec![
            (
                "TestChannelBasic/InMemoryChannel-messaging.knative.dev/v1".to_string(),
                TestOutcome::Passed
            ),
            (
                "TestChannelBasic/KafkaChannel-messaging.knative.dev/v1beta1".to_string(),
                TestOutcome::Passed
            ),
        ]
    );
}

#[tokio::test]
async fn test_matrix_filters_unsupported_feature() {
    let runner = runner();
    let t = TestHandle::new("TestChannelOrdering");

    runner
        .run_tests(&t, &Feature::STRICT_ORDERING, |_st, _component| async {})
        .await;

    let names: Vec<_> = outcomes(&t).into_iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        vec!["TestChannelOrdering/KafkaChannel-messaging.knative.dev/v1beta1"]
    );
}

#[tokio::test]
async fn test_failing_component_fails_parent() {
    let runner = runner();
    let t = TestHandle::new("TestChannelBasic");

    runner
        .run_tests(&t, &Feature::BASIC, |st, component| async move {
            if component.kind == "KafkaChannel" {
                st.error("no events received");
            }
        })
        .await;

    let results = outcomes(&t);
    assert_eq!(results[0].1, TestOutcome::Passed);
    assert_eq!(results[1].1, TestOutcome::Failed);
    assert!(t.failed());
}

#[tokio::test]
async fn test_strict_mode_records_skips() {
    let runner = runner();
    let t = TestHandle::new("TestChannelRedelivery");

    runner
        .run_tests_with_component_options(&t, &Feature::REDELIVERY, true, |_st, _c, _o| async {})
        .await;

    let results = outcomes(&t);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].1, TestOutcome::Passed);
    match &results[1].1 {
        TestOutcome::Skipped(reason) => {
            assert!(reason.contains("KafkaChannel-messaging.knative.dev/v1beta1"));
            assert!(reason.contains("redelivery"));
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(!t.failed());
}

#[tokio::test]
async fn test_non_strict_options_run_components_lacking_the_feature() {
    let runner = runner();
    let t = TestHandle::new("TestChannelOrdering");
    let ran = Arc::new(Mutex::new(Vec::new()));

    runner
        .run_tests_with_component_options(
            &t,
            &Feature::STRICT_ORDERING,
            false,
            |_st, component, _options| {
                let ran = ran.clone();
                async move { ran.lock().unwrap().push(component.kind) }
            },
        )
        .await;

    assert_eq!(*ran.lock().unwrap(), vec!["InMemoryChannel", "KafkaChannel"]);
    assert!(
        outcomes(&t)
            .iter()
            .all(|(_, outcome)| *outcome == TestOutcome::Passed)
    );
}

#[tokio::test]
async fn test_component_options_apply_to_component_session() {
    let mut runner = runner();
    let applied = Arc::new(Mutex::new(Vec::new()));
    for label in ["create-channel", "wait-ready"] {
        let applied = applied.clone();
        let option: SetupClientOption = Arc::new(move |session: &TestSession| {
            applied
                .lock()
                .unwrap()
                .push(format!("{}@{}", label, session.namespace()));
        });
        runner.add_component_setup_client_option(in_memory(), [option]);
    }

    let harness = Harness::new(fast_config(), Arc::new(FakeCluster::new()));
    let t = TestHandle::new("TestChannelRedelivery");

    runner
        .run_tests_with_component_options(
            &t,
            &Feature::REDELIVERY,
            false,
            |st, _component, options| {
                let harness = harness.clone();
                async move {
                    let session = harness.setup(&st, false, &options).await.unwrap();
                    session.tear_down().await;
                }
            },
        )
        .await;

    assert_eq!(
        *applied.lock().unwrap(),
        vec!["create-channel@eventing-e2e0", "wait-ready@eventing-e2e0"]
    );
    assert!(t.is_parallel());
}
