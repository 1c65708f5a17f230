//! Minimal GitLab REST API client.
//!
//! Only the endpoints the provider's resources use are implemented. Each
//! resource talks to GitLab through a narrow trait (for example
//! [`PrometheusServiceApi`]) so it can be exercised against an in-memory
//! fake.

mod client;
mod error;
mod services;

pub use client::{normalize_base_url, user_agent, GitlabClient};
pub use error::ApiError;
pub use services::{
    prometheus_service_path, PrometheusService, PrometheusServiceApi,
    PrometheusServiceProperties, SetPrometheusServiceOptions,
};

// Re-exported for implementors of the API traits.
pub use reqwest::{Method, StatusCode};
