//! Test utilities.
//!
//! - [`ProviderTester`] drives a [`ProviderService`] the way a host would,
//!   without a host process.
//! - [`InMemoryPrometheusApi`] stands in for GitLab when exercising resource
//!   operations directly.
//!
//! # Example
//!
//! ```ignore
//! use hemmer_provider_gitlab::testing::ProviderTester;
//! use hemmer_provider_gitlab::GitlabProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_integration() {
//!     let tester = ProviderTester::new(GitlabProvider::new());
//!     tester
//!         .configure(json!({"token": "glpat-test", "base_url": server.uri()}))
//!         .await
//!         .unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("gitlab_service_prometheus", json!({
//!             "project": "42",
//!             "api_url": "https://prom.example/api"
//!         }))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["id"], "101");
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::error::ProviderError;
use crate::gitlab::{
    prometheus_service_path, ApiError, Method, PrometheusService, PrometheusServiceApi,
    PrometheusServiceProperties, SetPrometheusServiceOptions, StatusCode,
};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Drives a [`ProviderService`] through host-style call sequences.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Names of the resource types the provider serves.
    pub fn resource_types(&self) -> Vec<String> {
        let mut types = self.provider.metadata().resources;
        types.sort();
        types
    }

    /// Validate provider configuration; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Validate resource configuration; error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan a create.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan an update from `prior_state` towards `config`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a destroy.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, planned: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned).await
    }

    /// Read a resource. `Value::Null` means it no longer exists.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Import an existing resource by id.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// plan -> create -> read. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// plan -> update -> read. Returns the state after read.
    ///
    /// Fails if the plan requires replacement, since a host would destroy and
    /// re-create instead of calling update.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        if plan.requires_replace {
            return Err(ProviderError::Validation(format!(
                "plan for {} requires replacement, not an in-place update",
                resource_type
            )));
        }
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }

    /// create -> update -> delete. Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;

        self.plan_delete(resource_type, updated.clone()).await?;
        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a tester call that reports diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The call returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The call failed outright.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "{} error diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  {}", diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that the plan changes nothing.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// Assert that the plan replaces the resource.
///
/// # Panics
///
/// Panics if the plan updates in place.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, changed: {:?}",
        changed_paths(plan)
    );
}

/// Assert that the plan updates the resource in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected in-place update, but the plan requires replacement"
    );
}

/// Assert that the plan changes the attribute at `path`.
///
/// # Panics
///
/// Panics if the attribute is not changed.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change '{}', changed: {:?}",
        path,
        changed_paths(plan)
    );
}

/// Assert that some error diagnostic's summary contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "Expected an error containing '{}', got: {:?}",
        substring,
        diagnostics.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// In-memory stand-in for GitLab's Prometheus integration endpoints.
///
/// Ids are assigned sequentially per new integration; re-setting an existing
/// one keeps its id and re-enables it. Delete disables the integration and
/// clears its properties but keeps the record, as GitLab does. Every set
/// request is recorded.
#[derive(Debug)]
pub struct InMemoryPrometheusApi {
    state: Mutex<InMemoryState>,
}

#[derive(Debug)]
struct InMemoryState {
    services: HashMap<String, PrometheusService>,
    set_requests: Vec<(String, SetPrometheusServiceOptions)>,
    next_id: i64,
    failure: Option<StatusCode>,
}

impl InMemoryPrometheusApi {
    /// An empty fake; the first integration gets id 1.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                services: HashMap::new(),
                set_requests: Vec::new(),
                next_id: 1,
                failure: None,
            }),
        }
    }

    /// Start id assignment at `id`.
    pub fn with_next_id(self, id: i64) -> Self {
        self.lock().next_id = id;
        self
    }

    /// Fail every call with `status`.
    pub fn failing_with(self, status: StatusCode) -> Self {
        self.lock().failure = Some(status);
        self
    }

    /// Recorded set requests as `(project, options)`.
    pub fn set_requests(&self) -> Vec<(String, SetPrometheusServiceOptions)> {
        self.lock().set_requests.clone()
    }

    /// The stored integration of a project.
    pub fn service(&self, project: &str) -> Option<PrometheusService> {
        self.lock().services.get(project).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryPrometheusApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryState {
    fn check(&self, method: Method, project: &str) -> Result<(), ApiError> {
        match self.failure {
            Some(status) => Err(fake_error(method, project, status)),
            None => Ok(()),
        }
    }
}

fn fake_error(method: Method, project: &str, status: StatusCode) -> ApiError {
    ApiError::Response {
        method,
        url: prometheus_service_path(project),
        status,
        message: status.to_string(),
    }
}

#[async_trait]
impl PrometheusServiceApi for InMemoryPrometheusApi {
    async fn set_prometheus_service(
        &self,
        project: &str,
        opts: &SetPrometheusServiceOptions,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.check(Method::PUT, project)?;
        state
            .set_requests
            .push((project.to_string(), opts.clone()));

        let now = Utc::now();
        let properties = PrometheusServiceProperties {
            api_url: opts.api_url.clone(),
            google_iap_audience_client_id: Some(opts.google_iap_audience_client_id.clone()),
            google_iap_service_account_json: None,
        };

        if let Some(existing) = state.services.get_mut(project) {
            existing.properties = Some(properties);
            existing.updated_at = Some(now);
            existing.active = true;
            return Ok(());
        }

        let id = state.next_id;
        state.next_id += 1;
        let service = PrometheusService {
            id,
            title: "Prometheus".to_string(),
            created_at: Some(now),
            updated_at: Some(now),
            active: true,
            properties: Some(properties),
        };
        state.services.insert(project.to_string(), service);
        Ok(())
    }

    async fn get_prometheus_service(&self, project: &str) -> Result<PrometheusService, ApiError> {
        let state = self.lock();
        state.check(Method::GET, project)?;
        state
            .services
            .get(project)
            .cloned()
            .ok_or_else(|| fake_error(Method::GET, project, StatusCode::NOT_FOUND))
    }

    async fn delete_prometheus_service(&self, project: &str) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.check(Method::DELETE, project)?;
        if let Some(existing) = state.services.get_mut(project) {
            existing.active = false;
            existing.properties = Some(PrometheusServiceProperties::default());
            existing.updated_at = Some(Utc::now());
        }
        Ok(())
    }
}
