//! Project integration ("service") endpoints.
//!
//! GitLab exposes each integration of a project under
//! `projects/:id/services/:slug`. Only the Prometheus integration is
//! modelled here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::GitlabClient;
use super::error::ApiError;

/// A project's Prometheus integration as GitLab reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrometheusService {
    /// Integration id, unique per project.
    pub id: i64,
    /// Display title, normally `Prometheus`.
    #[serde(default)]
    pub title: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether the integration is enabled.
    #[serde(default)]
    pub active: bool,
    /// Integration-specific settings.
    #[serde(default)]
    pub properties: Option<PrometheusServiceProperties>,
}

impl PrometheusService {
    /// The configured Prometheus API URL, empty when GitLab omits it.
    pub fn api_url(&self) -> &str {
        self.properties
            .as_ref()
            .map(|p| p.api_url.as_str())
            .unwrap_or_default()
    }
}

/// Settings nested under `properties`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrometheusServiceProperties {
    /// Prometheus API base URL.
    #[serde(default)]
    pub api_url: String,
    /// Google IAP client id, when Prometheus sits behind IAP.
    #[serde(default)]
    pub google_iap_audience_client_id: Option<String>,
    /// Google IAP service account key (GitLab usually masks it).
    #[serde(default)]
    pub google_iap_service_account_json: Option<String>,
}

/// Body of the "set Prometheus integration" request.
///
/// Every field is always serialised; an unset IAP field is sent as an
/// empty string so GitLab clears any previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetPrometheusServiceOptions {
    /// Prometheus API base URL.
    pub api_url: String,
    /// Google IAP client id.
    pub google_iap_audience_client_id: String,
    /// Google IAP service account key.
    pub google_iap_service_account_json: String,
}

/// The remote operations the `gitlab_service_prometheus` resource needs.
///
/// `project` is either a numeric project id or a `namespace/project` path.
#[async_trait]
pub trait PrometheusServiceApi: Send + Sync {
    /// Create or overwrite the integration. Re-enables a disabled one.
    async fn set_prometheus_service(
        &self,
        project: &str,
        opts: &SetPrometheusServiceOptions,
    ) -> Result<(), ApiError>;

    /// Fetch the integration.
    async fn get_prometheus_service(&self, project: &str) -> Result<PrometheusService, ApiError>;

    /// Disable the integration. GitLab keeps the record with `active: false`.
    async fn delete_prometheus_service(&self, project: &str) -> Result<(), ApiError>;
}

/// Relative API path of a project's Prometheus integration.
pub fn prometheus_service_path(project: &str) -> String {
    format!(
        "projects/{}/services/prometheus",
        urlencoding::encode(project)
    )
}

#[async_trait]
impl PrometheusServiceApi for GitlabClient {
    async fn set_prometheus_service(
        &self,
        project: &str,
        opts: &SetPrometheusServiceOptions,
    ) -> Result<(), ApiError> {
        self.put(&prometheus_service_path(project), opts).await
    }

    async fn get_prometheus_service(&self, project: &str) -> Result<PrometheusService, ApiError> {
        self.get(&prometheus_service_path(project)).await
    }

    async fn delete_prometheus_service(&self, project: &str) -> Result<(), ApiError> {
        self.delete(&prometheus_service_path(project)).await
    }
}
