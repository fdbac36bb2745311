//! Component test matrix
//!
//! Runs one sub-test per component (channel, broker, source implementation)
//! that supports a given feature. Components missing from the feature map
//! are assumed to support everything unless the caller asks for strict
//! matching.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::reporter::TestHandle;
use crate::session::SetupClientOption;

/// A named testable capability
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Feature(Cow<'static, str>);

impl Feature {
    /// Basic delivery of events
    pub const BASIC: Feature = Feature(Cow::Borrowed("basic"));
    /// Redelivery of events that failed
    pub const REDELIVERY: Feature = Feature(Cow::Borrowed("redelivery"));
    /// Events survive a component restart
    pub const PERSISTENCE: Feature = Feature(Cow::Borrowed("persistence"));
    /// Events are delivered in the order they were received
    pub const STRICT_ORDERING: Feature = Feature(Cow::Borrowed("strict-ordering"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A component implementation, identified by kind and API version
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentRef {
    pub kind: String,
    pub api_version: String,
}

impl ComponentRef {
    pub fn new(kind: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            api_version: api_version.into(),
        }
    }

    /// Sub-test name for this component
    pub fn test_name(&self) -> String {
        format!("{}-{}", self.kind, self.api_version)
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.api_version)
    }
}

/// How a component relates to a feature in the feature map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    /// Listed, and the feature is among its features
    Supported,
    /// Listed, without the feature
    Unsupported,
    /// Not in the map at all
    Unregistered,
}

impl Capability {
    /// Whether a component with this capability should be tested
    ///
    /// Unregistered components run only when matching is not strict.
    pub fn should_run(self, strict: bool) -> bool {
        match self {
            Capability::Supported => true,
            Capability::Unsupported => false,
            Capability::Unregistered => !strict,
        }
    }

    /// Whether a component gets its test body in
    /// [`ComponentsTestRunner::run_tests_with_component_options`]
    ///
    /// Outside strict mode every component runs; strict mode runs only
    /// components whose map entry lists the feature.
    pub fn should_run_with_options(self, strict: bool) -> bool {
        !strict || self == Capability::Supported
    }
}

/// Runs tests against every component that supports a feature
#[derive(Clone, Default)]
pub struct ComponentsTestRunner {
    /// Features supported by each known component
    pub component_feature_map: HashMap<ComponentRef, Vec<Feature>>,
    /// Components to run tests against, in order
    pub components_to_test: Vec<ComponentRef>,
    component_options: HashMap<ComponentRef, Vec<SetupClientOption>>,
}

impl ComponentsTestRunner {
    pub fn new(
        component_feature_map: HashMap<ComponentRef, Vec<Feature>>,
        components_to_test: Vec<ComponentRef>,
    ) -> Self {
        Self {
            component_feature_map,
            components_to_test,
            component_options: HashMap::new(),
        }
    }

    /// Look up `component` against `feature`
    pub fn capability(&self, component: &ComponentRef, feature: &Feature) -> Capability {
        match self.component_feature_map.get(component) {
            Some(features) if features.contains(feature) => Capability::Supported,
            Some(_) => Capability::Unsupported,
            None => Capability::Unregistered,
        }
    }

    /// Run `test_fn` as a sub-test for every component that supports `feature`
    ///
    /// Components not in the feature map are treated as supporting it. No
    /// sub-test is recorded for components that are filtered out.
    pub async fn run_tests<F, Fut>(&self, t: &TestHandle, feature: &Feature, test_fn: F)
    where
        F: Fn(TestHandle, ComponentRef) -> Fut,
        Fut: Future<Output = ()>,
    {
        t.parallel();
        for component in &self.components_to_test {
            if !self.capability(component, feature).should_run(false) {
                debug!(component = %component, feature = %feature, "Component does not support feature");
                continue;
            }
            t.run(&component.test_name(), |st| test_fn(st, component.clone()))
                .await;
        }
    }

    /// Like [`ComponentsTestRunner::run_tests`], passing each component's
    /// registered setup options to `test_fn`
    ///
    /// A sub-test is recorded for every component. Without `strict` every
    /// component runs. With `strict`, components whose map entry does not
    /// list the feature (or that have no entry) are skipped inside their
    /// sub-test.
    pub async fn run_tests_with_component_options<F, Fut>(
        &self,
        t: &TestHandle,
        feature: &Feature,
        strict: bool,
        test_fn: F,
    ) where
        F: Fn(TestHandle, ComponentRef, Vec<SetupClientOption>) -> Fut,
        Fut: Future<Output = ()>,
    {
        t.parallel();
        for component in &self.components_to_test {
            let run = self
                .capability(component, feature)
                .should_run_with_options(strict);
            let test_fn = &test_fn;

            t.run(&component.test_name(), |st| async move {
                if run {
                    test_fn(st, component.clone(), self.component_options(component)).await;
                } else {
                    st.skip(format!(
                        "Skipping component {} since it did not match the feature {} and we are in strict mode",
                        component, feature
                    ));
                }
            })
            .await;
        }
    }

    /// Register setup options that only run when `component` is selected
    ///
    /// Use this for expensive initialization (e.g. creating a channel
    /// instance); options accumulate across calls.
    pub fn add_component_setup_client_option(
        &mut self,
        component: ComponentRef,
        options: impl IntoIterator<Item = SetupClientOption>,
    ) {
        self.component_options
            .entry(component)
            .or_default()
            .extend(options);
    }

    /// Options registered for `component`, in registration order
    pub fn component_options(&self, component: &ComponentRef) -> Vec<SetupClientOption> {
        self.component_options
            .get(component)
            .cloned()
            .unwrap_or_default()
    }
}
