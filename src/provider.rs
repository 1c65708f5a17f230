//! The GitLab provider.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{validate_config, ProviderConfig};
use crate::error::ProviderError;
use crate::gitlab::GitlabClient;
use crate::plan::plan_resource;
use crate::resource::ResourceData;
use crate::resources::{schema_for, service_prometheus};
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

/// Provider managing GitLab project integrations.
///
/// Resource operations fail with [`ProviderError::Configuration`] until
/// [`ProviderService::configure`] has succeeded.
#[derive(Debug, Default)]
pub struct GitlabProvider {
    client: RwLock<Option<Arc<GitlabClient>>>,
}

impl GitlabProvider {
    /// An unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider already configured with `client`.
    pub fn with_client(client: GitlabClient) -> Self {
        Self {
            client: RwLock::new(Some(Arc::new(client))),
        }
    }

    /// The configured client.
    pub async fn client(&self) -> Result<Arc<GitlabClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }
}

#[async_trait::async_trait]
impl ProviderService for GitlabProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(service_prometheus::RESOURCE_TYPE, service_prometheus::schema())
    }

    #[instrument(skip(self, config), name = "provider.validate_provider_config")]
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate_config(&config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "provider config has errors");
        }
        Ok(diagnostics)
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate_config(&config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "configure rejected");
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(config)?.with_env_fallback();
        let client = config.build_client().await?;
        info!(base_url = %client.base_url(), insecure = config.insecure, "provider configured");

        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        info!("provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&schema_for(resource_type)?, &config))
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = schema_for(resource_type)?;
        let plan = plan_resource(&schema, prior_state.as_ref(), &proposed_state);
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "plan computed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        schema_for(resource_type)?;
        let client = self.client().await?;
        let mut d = ResourceData::from_state(planned_state)?;

        if let Err(e) = service_prometheus::create(&mut d, client.as_ref()).await {
            error!(error = %e, "create failed");
            return Err(e);
        }
        info!(id = d.id().unwrap_or_default(), "resource created");
        Ok(d.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        schema_for(resource_type)?;
        let client = self.client().await?;
        let mut d = ResourceData::from_state(current_state)?;

        service_prometheus::read(&mut d, client.as_ref()).await?;
        Ok(d.into_state())
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = schema_for(resource_type)?;
        let client = self.client().await?;
        let prior = ResourceData::from_state(prior_state)?;
        let mut d = ResourceData::from_state(planned_state)?;
        check_force_new_unchanged(&schema, &prior, &d)?;
        if d.id().is_none() {
            if let Some(id) = prior.id() {
                d.set_id(id);
            }
        }

        if let Err(e) = service_prometheus::update(&mut d, client.as_ref()).await {
            error!(error = %e, "update failed");
            return Err(e);
        }
        info!(id = d.id().unwrap_or_default(), "resource updated");
        Ok(d.into_state())
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        schema_for(resource_type)?;
        let client = self.client().await?;
        let mut d = ResourceData::from_state(current_state)?;

        if let Err(e) = service_prometheus::delete(&mut d, client.as_ref()).await {
            error!(error = %e, "delete failed");
            return Err(e);
        }
        info!("resource deleted");
        Ok(())
    }

    /// Import by project ID or path.
    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        schema_for(resource_type)?;
        let client = self.client().await?;
        let mut d = ResourceData::new();
        d.set("project", id);

        service_prometheus::read(&mut d, client.as_ref()).await?;
        match d.into_state() {
            Value::Null => Err(ProviderError::NotFound(format!(
                "no prometheus service configured for project {}",
                id
            ))),
            state => {
                info!("resource imported");
                Ok(vec![ImportedResource::new(resource_type, state)])
            },
        }
    }
}

/// Reject an in-place update of an attribute that requires replacement.
fn check_force_new_unchanged(
    schema: &Schema,
    prior: &ResourceData,
    planned: &ResourceData,
) -> Result<(), ProviderError> {
    for (name, attr) in schema.sorted_attributes() {
        if !attr.force_new {
            continue;
        }
        if let Some(before) = prior.get(name) {
            if planned.get(name) != Some(before) {
                return Err(ProviderError::Validation(format!(
                    "'{}' cannot be changed in place, the resource must be replaced",
                    name
                )));
            }
        }
    }
    Ok(())
}
