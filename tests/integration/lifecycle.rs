//! Setup and teardown against a live cluster

use k8s_openapi::api::core::v1::{ConfigMap, Namespace, ServiceAccount};
use kube::Api;
use kube::core::ObjectMeta;

use eventing_e2e_harness::rbac::EVENT_WATCHER_SUFFIX;
use eventing_e2e_harness::{ComponentRef, ComponentsTestRunner, Feature, TestHandle};

use crate::{client, harness};

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn test_setup_creates_namespace_and_rbac() {
    let harness = harness().await;
    let t = TestHandle::new("test_setup_creates_namespace_and_rbac");

    let session = harness.setup(&t, false, &[]).await.unwrap();
    let client = client(&harness).await;
    let namespace = session.namespace().to_string();

    let accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), &namespace);
    assert!(accounts.get_opt("default").await.unwrap().is_some());
    assert!(accounts.get_opt(&namespace).await.unwrap().is_some());
    assert!(
        accounts
            .get_opt(&format!("{}{}", namespace, EVENT_WATCHER_SUFFIX))
            .await
            .unwrap()
            .is_some()
    );

    session.tear_down().await;
    assert!(!t.failed(), "logs: {:?}", t.logs());

    let namespaces: Api<Namespace> = Api::all(client);
    let remaining = namespaces.get_opt(&namespace).await.unwrap();
    assert!(
        remaining.is_none_or(|ns| ns.metadata.deletion_timestamp.is_some()),
        "namespace {} should be gone or terminating",
        namespace
    );
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn test_tracked_resources_are_deleted() {
    let harness = harness().await;
    let t = TestHandle::new("test_tracked_resources_are_deleted");

    let session = harness.setup(&t, false, &[]).await.unwrap();
    let cm = ConfigMap {
        metadata: ObjectMeta {
            name: Some("tracked".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    session.create_resource(&cm, true).await.unwrap();

    let configmaps: Api<ConfigMap> = Api::namespaced(client(&harness).await, session.namespace());
    assert!(configmaps.get_opt("tracked").await.unwrap().is_some());

    session.tear_down().await;
    assert!(configmaps.get_opt("tracked").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn test_component_matrix_against_cluster() {
    let harness = harness().await;
    let runner = ComponentsTestRunner::new(
        Default::default(),
        vec![ComponentRef::new("InMemoryChannel", "messaging.knative.dev/v1")],
    );
    let t = TestHandle::new("test_component_matrix_against_cluster");

    runner
        .run_tests(&t, &Feature::BASIC, |st, _component| {
            let harness = harness.clone();
            async move {
                let session = harness.setup(&st, false, &[]).await.unwrap();
                session.tear_down().await;
            }
        })
        .await;

    assert_eq!(t.subtests().len(), 1);
    assert!(!t.failed(), "logs: {:?}", t.subtests()[0].logs());
}
