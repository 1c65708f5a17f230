//! Resource implementations.

pub mod service_prometheus;

use crate::error::ProviderError;
use crate::schema::Schema;

/// Schema of a resource type, or `UnknownResource`.
pub fn schema_for(resource_type: &str) -> Result<Schema, ProviderError> {
    match resource_type {
        service_prometheus::RESOURCE_TYPE => Ok(service_prometheus::schema()),
        other => Err(ProviderError::UnknownResource(other.to_string())),
    }
}
