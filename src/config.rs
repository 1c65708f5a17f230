//! Provider configuration.
//!
//! Every setting can come from the provider block; `token` and `base_url`
//! fall back to the `GITLAB_TOKEN` and `GITLAB_BASE_URL` environment
//! variables.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::ProviderError;
use crate::gitlab::{normalize_base_url, user_agent, GitlabClient};
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// API base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/api/v4/";

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Environment variable holding the base URL.
pub const BASE_URL_ENV: &str = "GITLAB_BASE_URL";

/// Settings from the provider configuration block.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Personal, project or group access token.
    pub token: Option<String>,
    /// GitLab URL, with or without the `/api/v4` suffix.
    pub base_url: Option<String>,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Path of a PEM file with an additional trusted CA.
    pub cacert_file: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("insecure", &self.insecure)
            .field("cacert_file", &self.cacert_file)
            .finish()
    }
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .with_description(format!(
                        "GitLab access token. Defaults to ${}.",
                        TOKEN_ENV
                    ))
                    .sensitive(),
            )
            .with_attribute(
                "base_url",
                Attribute::optional_string().with_description(format!(
                    "GitLab API URL. Defaults to ${} or {}.",
                    BASE_URL_ENV, DEFAULT_BASE_URL
                )),
            )
            .with_attribute(
                "insecure",
                Attribute::optional_bool().with_description("Disable TLS certificate verification."),
            )
            .with_attribute(
                "cacert_file",
                Attribute::optional_string()
                    .with_description("PEM file with an additional trusted CA certificate."),
            )
    }

    /// Decode the provider block. `null` yields the defaults.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill unset `token`/`base_url` from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Fill unset `token`/`base_url` from `lookup`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if is_unset(&self.token) {
            self.token = lookup(TOKEN_ENV).filter(|v| !v.is_empty());
        }
        if is_unset(&self.base_url) {
            self.base_url = lookup(BASE_URL_ENV).filter(|v| !v.is_empty());
        }
        self
    }

    /// Check a resolved configuration.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if is_unset(&self.token) {
            diagnostics.push(
                Diagnostic::error("Missing GitLab token")
                    .with_detail(format!("Set `token` or the {} environment variable", TOKEN_ENV))
                    .with_attribute("token"),
            );
        }

        if let Err(err) = self.api_url() {
            diagnostics.push(
                Diagnostic::error("Invalid GitLab base URL")
                    .with_detail(err.message())
                    .with_attribute("base_url"),
            );
        }

        if self.insecure {
            diagnostics.push(
                Diagnostic::warning("TLS certificate verification is disabled")
                    .with_attribute("insecure"),
            );
        }

        diagnostics
    }

    /// The normalised API base URL.
    pub fn api_url(&self) -> Result<Url, ProviderError> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BASE_URL);
        normalize_base_url(raw)
            .map_err(|e| ProviderError::Configuration(format!("{}: {}", raw, e)))
    }

    /// Build an API client from a resolved configuration.
    pub async fn build_client(&self) -> Result<GitlabClient, ProviderError> {
        let token = self
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Configuration("missing GitLab token".to_string()))?;
        let base_url = self.api_url()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(user_agent())
            .danger_accept_invalid_certs(self.insecure);

        if let Some(path) = self.cacert_file.as_deref().filter(|p| !p.is_empty()) {
            let pem = tokio::fs::read(path).await.map_err(|e| {
                ProviderError::Configuration(format!("reading cacert_file {}: {}", path, e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ProviderError::Configuration(format!("parsing cacert_file {}: {}", path, e))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| ProviderError::Configuration(format!("building HTTP client: {}", e)))?;

        Ok(GitlabClient::with_http_client(http, base_url, token))
    }
}

/// Validate a raw provider block, including environment fallbacks.
pub fn validate_config(value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validate(&ProviderConfig::schema(), value);
    if !diagnostics.is_empty() {
        return diagnostics;
    }

    match ProviderConfig::from_value(value.clone()) {
        Ok(config) => diagnostics.extend(config.with_env_fallback().diagnostics()),
        Err(err) => diagnostics.push(Diagnostic::error(err.to_string())),
    }
    diagnostics
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}
