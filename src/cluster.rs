//! Cluster API access
//!
//! [`ClusterApi`] is the only way the harness talks to the cluster. The real
//! implementation wraps a `kube::Client`; tests substitute mocks or fakes.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Event, LocalObjectReference, Namespace, Pod, Secret, ServiceAccount,
};
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, ListParams, LogParams, Patch, PatchParams,
    PostParams,
};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::ObjectMeta;
use kube::{Client, Config};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::config::HarnessConfig;
use crate::error::{Result, is_already_exists};

/// A cluster object created during a test and deleted at teardown
#[derive(Clone, Debug)]
pub struct TrackedResource {
    /// Group/version/kind/plural of the object
    pub resource: ApiResource,
    /// `None` for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl TrackedResource {
    pub fn new(resource: ApiResource, namespace: Option<&str>, name: &str) -> Self {
        Self {
            resource,
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for TrackedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.resource.kind, ns, self.name),
            None => write!(f, "{} {}", self.resource.kind, self.name),
        }
    }
}

/// Trait abstracting the cluster operations the harness needs
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a namespace with the given name
    async fn create_namespace(&self, name: &str) -> Result<()>;

    /// Fetch a namespace; NotFound surfaces as an error
    async fn get_namespace(&self, name: &str) -> Result<Namespace>;

    /// Delete a namespace
    async fn delete_namespace(&self, name: &str) -> Result<()>;

    /// Fetch a ServiceAccount
    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount>;

    /// Copy a secret into another namespace and attach it as an image pull
    /// secret of `service_account` there
    async fn copy_secret(
        &self,
        source_namespace: &str,
        secret_name: &str,
        target_namespace: &str,
        service_account: &str,
    ) -> Result<Secret>;

    /// List all events in a namespace
    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>>;

    /// List all pods in a namespace
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>>;

    /// Fetch the logs of one container
    async fn pod_logs(&self, namespace: &str, pod: &str, container: &str) -> Result<String>;

    /// Create an arbitrary object from its serialized form
    async fn create_object(&self, target: &TrackedResource, body: serde_json::Value)
    -> Result<()>;

    /// Delete an arbitrary object
    async fn delete_object(&self, target: &TrackedResource) -> Result<()>;

    /// Check whether an arbitrary object still exists
    async fn object_exists(&self, target: &TrackedResource) -> Result<bool>;
}

/// Real Kubernetes implementation of [`ClusterApi`]
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the harness configuration
    ///
    /// Uses the configured kubeconfig and context when set, otherwise infers
    /// the config from the environment (~/.kube/config, KUBECONFIG or in-cluster).
    pub async fn connect(config: &HarnessConfig) -> Result<Self> {
        let options = KubeConfigOptions {
            context: config.cluster.clone(),
            ..Default::default()
        };

        let kube_config = match (&config.kubeconfig, &config.cluster) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &options).await?
            }
            (None, Some(_)) => Config::from_kubeconfig(&options).await?,
            (None, None) => Config::infer().await?,
        };

        info!(cluster_url = %kube_config.cluster_url, "Connecting to Kubernetes cluster");
        let client = Client::try_from(kube_config)?;
        Ok(Self { client })
    }

    /// Get a clone of the client
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    fn dynamic_api(&self, target: &TrackedResource) -> Api<DynamicObject> {
        match &target.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &target.resource),
            None => Api::all_with(self.client.clone(), &target.resource),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn create_namespace(&self, name: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        namespaces.create(&PostParams::default(), &ns).await?;
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces.get(name).await?)
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn get_service_account(&self, namespace: &str, name: &str) -> Result<ServiceAccount> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        Ok(accounts.get(name).await?)
    }

    async fn copy_secret(
        &self,
        source_namespace: &str,
        secret_name: &str,
        target_namespace: &str,
        service_account: &str,
    ) -> Result<Secret> {
        let source: Api<Secret> = Api::namespaced(self.client.clone(), source_namespace);
        let target: Api<Secret> = Api::namespaced(self.client.clone(), target_namespace);
        let accounts: Api<ServiceAccount> =
            Api::namespaced(self.client.clone(), target_namespace);

        let original = source.get(secret_name).await?;

        let copy = Secret {
            metadata: ObjectMeta {
                name: Some(secret_name.to_string()),
                ..Default::default()
            },
            data: original.data.clone(),
            type_: original.type_.clone(),
            ..Default::default()
        };

        let created = match target.create(&PostParams::default(), &copy).await {
            Ok(secret) => secret,
            Err(e) if is_already_exists(&e) => {
                debug!(namespace = %target_namespace, secret = %secret_name, "Secret already copied");
                copy
            }
            Err(e) => return Err(e.into()),
        };

        let account = accounts.get(service_account).await?;
        let mut pull_secrets = account.image_pull_secrets.unwrap_or_default();
        if pull_secrets.iter().any(|s| s.name == secret_name) {
            return Ok(created);
        }
        pull_secrets.push(LocalObjectReference {
            name: secret_name.to_string(),
        });

        let patch = serde_json::json!({ "imagePullSecrets": pull_secrets });
        accounts
            .patch(service_account, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        Ok(created)
    }

    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        Ok(events.list(&ListParams::default()).await?.items)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(pods.list(&ListParams::default()).await?.items)
    }

    async fn pod_logs(&self, namespace: &str, pod: &str, container: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            ..Default::default()
        };
        Ok(pods.logs(pod, &params).await?)
    }

    async fn create_object(
        &self,
        target: &TrackedResource,
        body: serde_json::Value,
    ) -> Result<()> {
        let object: DynamicObject = serde_json::from_value(body)?;
        self.dynamic_api(target)
            .create(&PostParams::default(), &object)
            .await?;
        Ok(())
    }

    async fn delete_object(&self, target: &TrackedResource) -> Result<()> {
        self.dynamic_api(target)
            .delete(&target.name, &DeleteParams::foreground())
            .await?;
        Ok(())
    }

    async fn object_exists(&self, target: &TrackedResource) -> Result<bool> {
        Ok(self.dynamic_api(target).get_opt(&target.name).await?.is_some())
    }
}
