//! Test setup
//!
//! [`Harness`] bundles the collaborators every test needs and provisions a
//! fresh [`TestSession`] per test.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, info};

use crate::cluster::{ClusterApi, KubeClusterApi};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::interrupt::InterruptRegistry;
use crate::namespace::{NamespaceAllocator, create_namespaced_session};
use crate::rbac::{
    EVENT_WATCHER_SUFFIX, create_rbac_pods_events_get_list_watch, create_rbac_pods_get_events_all,
};
use crate::reporter::TestHandle;
use crate::session::{SetupClientOption, TestSession};
use crate::wait::poll_immediate;

/// Image pull secret copied into every test namespace when present
pub const TEST_PULL_SECRET_NAME: &str = "kn-eventing-test-pull-secret";
/// Namespace the pull secret is copied from
pub const PULL_SECRET_SOURCE_NAMESPACE: &str = "default";
/// ServiceAccount pods run as unless told otherwise
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Shared state for all tests in a process
#[derive(Clone)]
pub struct Harness {
    config: Arc<HarnessConfig>,
    api: Arc<dyn ClusterApi>,
    allocator: Arc<NamespaceAllocator>,
    interrupts: InterruptRegistry,
    handle_interrupts: bool,
}

impl Harness {
    /// Build a harness over any cluster API
    ///
    /// Interrupt handling is off; enable it with [`Harness::with_interrupt_handler`].
    pub fn new(config: HarnessConfig, api: Arc<dyn ClusterApi>) -> Self {
        let allocator = Arc::new(NamespaceAllocator::from_config(&config));
        Self {
            config: Arc::new(config),
            api,
            allocator,
            interrupts: InterruptRegistry::new(),
            handle_interrupts: false,
        }
    }

    /// Connect to the configured cluster with Ctrl+C cleanup enabled
    pub async fn connect(config: HarnessConfig) -> Result<Self> {
        let api = KubeClusterApi::connect(&config).await?;
        Ok(Self::new(config, Arc::new(api)).with_interrupt_handler(true))
    }

    pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
        self.handle_interrupts = enabled;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn ClusterApi> {
        &self.api
    }

    pub fn allocator(&self) -> &NamespaceAllocator {
        &self.allocator
    }

    pub fn interrupts(&self) -> &InterruptRegistry {
        &self.interrupts
    }

    /// Create a session in a fresh namespace and prepare it for the test
    ///
    /// Unless namespaces are reused, waits for the default ServiceAccount,
    /// copies the pull secret and grants the RBAC test pods need. Any failure
    /// here fails the test.
    pub async fn setup(
        &self,
        t: &TestHandle,
        run_in_parallel: bool,
        options: &[SetupClientOption],
    ) -> Result<TestSession> {
        let session = match create_namespaced_session(
            self.api.clone(),
            self.config.clone(),
            &self.allocator,
            t.clone(),
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                t.fatal(format!("Couldn't initialize clients: {}", e));
                return Err(e);
            }
        };

        if !self.config.reuse_namespace {
            if let Err(e) = self.provision(&session).await {
                t.fatal(e.to_string());
                return Err(e);
            }
        }

        if run_in_parallel {
            t.parallel();
        }

        self.register_interrupt_cleanup(&session);

        for option in options {
            option(&session);
        }

        info!(namespace = %session.namespace(), test = %t.name(), "Test session ready");
        Ok(session)
    }

    async fn provision(&self, session: &TestSession) -> Result<()> {
        setup_service_account(session).await?;
        setup_pull_secret(session).await?;

        let namespace = session.namespace().to_string();
        create_rbac_pods_get_events_all(session, &namespace).await?;
        create_rbac_pods_events_get_list_watch(
            session,
            &format!("{}{}", namespace, EVENT_WATCHER_SUFFIX),
        )
        .await
    }

    fn register_interrupt_cleanup(&self, session: &TestSession) {
        let weak = session.downgrade();
        let callback = move || {
            async move {
                if let Some(inner) = weak.upgrade() {
                    TestSession::from_inner(inner).tear_down().await;
                }
            }
            .boxed()
        };

        let registration = if self.handle_interrupts {
            self.interrupts.register(callback)
        } else {
            self.interrupts.register_without_listener(callback)
        };
        session.set_interrupt_registration(registration);
    }
}

/// Wait until the namespace's default ServiceAccount exists
///
/// Pods cannot be created before the controller manager has created it.
/// Lookup errors count as "not yet".
pub async fn setup_service_account(session: &TestSession) -> Result<()> {
    wait_for_service_account_exists(session, DEFAULT_SERVICE_ACCOUNT).await
}

pub async fn wait_for_service_account_exists(session: &TestSession, name: &str) -> Result<()> {
    let api = session.api();
    let namespace = session.namespace();

    poll_immediate(&session.config().service_account_wait, move || async move {
        api.get_service_account(namespace, name).await.is_ok()
    })
    .await
    .map_err(|_| Error::ServiceAccountNotReadyError {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })?;

    debug!(namespace = %namespace, service_account = %name, "ServiceAccount exists");
    Ok(())
}

/// Copy the test pull secret into the session namespace if the source has one
pub async fn setup_pull_secret(session: &TestSession) -> Result<()> {
    match session
        .api()
        .copy_secret(
            PULL_SECRET_SOURCE_NAMESPACE,
            TEST_PULL_SECRET_NAME,
            session.namespace(),
            DEFAULT_SERVICE_ACCOUNT,
        )
        .await
    {
        Ok(_) => {
            debug!(namespace = %session.namespace(), "Copied test pull secret");
            Ok(())
        }
        Err(e) if e.is_not_found() => Ok(()),
        Err(Error::KubeError(source)) => Err(Error::PullSecretError {
            namespace: session.namespace().to_string(),
            source,
        }),
        Err(e) => Err(e),
    }
}
