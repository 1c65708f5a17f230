//! Hemmer GitLab Provider
//!
//! Manages GitLab project integrations as declarative resources. The
//! provider follows the Terraform resource model: a host fetches the schema,
//! configures the provider with credentials, then plans and applies changes
//! through create/read/update/delete.
//!
//! # Resources
//!
//! - `gitlab_service_prometheus`: the Prometheus integration of a project
//!   (`PUT`/`GET`/`DELETE /projects/:id/services/prometheus`).
//!
//! # Quick Start
//!
//! ```ignore
//! use hemmer_provider_gitlab::{init_logging, GitlabProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = GitlabProvider::new();
//!     provider
//!         .configure(json!({"base_url": "https://gitlab.example.com"}))
//!         .await?;
//!
//!     let state = provider
//!         .create("gitlab_service_prometheus", json!({
//!             "project": "group/project",
//!             "api_url": "https://prometheus.example.com"
//!         }))
//!         .await?;
//!     tracing::info!(id = %state["id"], "integration enabled");
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! | Attribute     | Environment       | Default                      |
//! |---------------|-------------------|------------------------------|
//! | `token`       | `GITLAB_TOKEN`    | required                     |
//! | `base_url`    | `GITLAB_BASE_URL` | `https://gitlab.com/api/v4/` |
//! | `insecure`    |                   | `false`                      |
//! | `cacert_file` |                   | none                         |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gitlab;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use gitlab::{ApiError, GitlabClient};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::GitlabProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
