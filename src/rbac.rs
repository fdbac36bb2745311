//! RBAC objects granted to test namespaces
//!
//! Test pods watch events and read pods, so every new namespace gets a
//! cluster-wide binding and an `-eventwatcher` namespaced binding.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use kube::core::ObjectMeta;

use crate::error::Result;
use crate::session::TestSession;

/// Suffix of the namespaced event watcher identity
pub const EVENT_WATCHER_SUFFIX: &str = "-eventwatcher";

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        ..Default::default()
    }
}

fn rule(resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![String::new()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

fn service_account_subject(name: &str, namespace: &str) -> Subject {
    Subject {
        kind: "ServiceAccount".to_string(),
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

/// Generate a ServiceAccount
pub fn service_account(name: &str, namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: meta(name, Some(namespace)),
        ..Default::default()
    }
}

/// ClusterRole allowing `get` on pods and everything on events
pub fn pods_get_events_all_cluster_role(name: &str) -> ClusterRole {
    ClusterRole {
        metadata: meta(name, None),
        rules: Some(vec![rule(&["pods"], &["get"]), rule(&["events"], &["*"])]),
        ..Default::default()
    }
}

/// ClusterRoleBinding of `role` to the ServiceAccount `account` in `namespace`
pub fn cluster_role_binding(
    name: &str,
    role: &str,
    account: &str,
    namespace: &str,
) -> ClusterRoleBinding {
    ClusterRoleBinding {
        metadata: meta(name, None),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "ClusterRole".to_string(),
            name: role.to_string(),
        },
        subjects: Some(vec![service_account_subject(account, namespace)]),
    }
}

/// Role allowing get/list/watch on pods and events
pub fn pods_events_get_list_watch_role(name: &str, namespace: &str) -> Role {
    Role {
        metadata: meta(name, Some(namespace)),
        rules: Some(vec![rule(&["pods", "events"], &["get", "list", "watch"])]),
    }
}

/// RoleBinding of `role` to the ServiceAccount `account` in `namespace`
pub fn role_binding(name: &str, role: &str, account: &str, namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: meta(name, Some(namespace)),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name: role.to_string(),
        },
        subjects: Some(vec![service_account_subject(account, namespace)]),
    }
}

/// Broad permissions: ServiceAccount, ClusterRole and ClusterRoleBinding named `name`
pub async fn create_rbac_pods_get_events_all(session: &TestSession, name: &str) -> Result<()> {
    let namespace = session.namespace().to_string();
    session
        .create_resource(&service_account(name, &namespace), true)
        .await?;
    session
        .create_resource(&pods_get_events_all_cluster_role(name), false)
        .await?;
    session
        .create_resource(&cluster_role_binding(name, name, name, &namespace), false)
        .await
}

/// Namespaced permissions: ServiceAccount, Role and RoleBinding named `name`
pub async fn create_rbac_pods_events_get_list_watch(
    session: &TestSession,
    name: &str,
) -> Result<()> {
    let namespace = session.namespace().to_string();
    session
        .create_resource(&service_account(name, &namespace), true)
        .await?;
    session
        .create_resource(&pods_events_get_list_watch_role(name, &namespace), true)
        .await?;
    session
        .create_resource(&role_binding(name, name, name, &namespace), true)
        .await
}
