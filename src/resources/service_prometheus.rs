//! `gitlab_service_prometheus`: a project's Prometheus integration.
//!
//! GitLab has no partial update for integrations, so create and update share
//! one reconcile path that always submits every option.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::gitlab::{PrometheusService, PrometheusServiceApi, SetPrometheusServiceOptions};
use crate::resource::{ResourceData, ID_ATTRIBUTE};
use crate::schema::{Attribute, Schema};

/// Resource type name.
pub const RESOURCE_TYPE: &str = "gitlab_service_prometheus";

/// Schema of the resource.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Manages the Prometheus integration of a GitLab project.")
        .with_attribute(
            "project",
            Attribute::required_string()
                .with_description("ID or full path of the project.")
                .with_force_new(),
        )
        .with_attribute(
            "api_url",
            Attribute::required_string()
                .with_description("Prometheus API base URL.")
                .with_force_new(),
        )
        .with_attribute(
            "google_iap_audience_client_id",
            Attribute::optional_string()
                .with_description("Client ID of the IAP secured resource."),
        )
        .with_attribute(
            "google_iap_service_account_json",
            Attribute::optional_string()
                .with_description("Contents of the credentials.json file of the IAP service account.")
                .sensitive(),
        )
        .with_attribute(ID_ATTRIBUTE, Attribute::computed_string())
        .with_attribute("title", Attribute::computed_string())
        .with_attribute("created_at", Attribute::computed_string())
        .with_attribute("updated_at", Attribute::computed_string())
        .with_attribute("active", Attribute::computed_bool())
}

/// Create the integration, then refresh `d` from GitLab.
pub async fn create(
    d: &mut ResourceData,
    client: &dyn PrometheusServiceApi,
) -> Result<(), ProviderError> {
    reconcile(d, client).await
}

/// Refresh `d` from GitLab.
///
/// A 404 or a disabled integration clears the identifier instead of
/// failing, so the host drops the resource from its state and plans a
/// re-create. GitLab answers delete by disabling, not removing.
pub async fn read(
    d: &mut ResourceData,
    client: &dyn PrometheusServiceApi,
) -> Result<(), ProviderError> {
    let project = d.get_string("project");
    debug!(project = %project, "read gitlab prometheus service");

    match client.get_prometheus_service(&project).await {
        Ok(service) if !service.active => {
            warn!(project = %project, id = service.id, "prometheus service is disabled, removing from state");
            d.clear_id();
            Ok(())
        },
        Ok(service) => {
            set_to_state(d, &service);
            Ok(())
        },
        Err(err) if err.is_not_found() => {
            warn!(project = %project, error = %err, "prometheus service not found, removing from state");
            d.clear_id();
            Ok(())
        },
        Err(err) => Err(err.into()),
    }
}

/// Re-submit the full configuration.
pub async fn update(
    d: &mut ResourceData,
    client: &dyn PrometheusServiceApi,
) -> Result<(), ProviderError> {
    reconcile(d, client).await
}

/// Remove the integration.
pub async fn delete(
    d: &mut ResourceData,
    client: &dyn PrometheusServiceApi,
) -> Result<(), ProviderError> {
    let project = d.get_string("project");
    debug!(project = %project, "delete gitlab prometheus service");

    client.delete_prometheus_service(&project).await?;
    Ok(())
}

async fn reconcile(
    d: &mut ResourceData,
    client: &dyn PrometheusServiceApi,
) -> Result<(), ProviderError> {
    let project = d.get_string("project");
    let opts = SetPrometheusServiceOptions {
        api_url: d.get_string("api_url"),
        google_iap_audience_client_id: d.get_string("google_iap_audience_client_id"),
        google_iap_service_account_json: d.get_string("google_iap_service_account_json"),
    };

    debug!(project = %project, api_url = %opts.api_url, "set gitlab prometheus service");
    client.set_prometheus_service(&project, &opts).await?;

    // The integration was just written, so a missing one here is an error
    // rather than a vanished resource.
    let service = client.get_prometheus_service(&project).await?;
    set_to_state(d, &service);
    Ok(())
}

fn set_to_state(d: &mut ResourceData, service: &PrometheusService) {
    d.set_id(service.id.to_string());
    d.set("api_url", service.api_url());
    d.set("title", service.title.as_str());
    d.set("created_at", format_timestamp(service.created_at));
    d.set("updated_at", format_timestamp(service.updated_at));
    d.set("active", service.active);
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}
