//! The configuration record a resource operation reads and writes.

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// Attribute holding the resource's local identifier.
pub const ID_ATTRIBUTE: &str = "id";

/// Mutable view of one resource instance's state.
///
/// Resource operations read their inputs by attribute name, write back what
/// GitLab reports, and set the identifier. An empty identifier means the
/// resource does not exist; [`ResourceData::into_state`] then yields `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a state value received from the host. `null` yields an empty record.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        match state {
            Value::Object(attributes) => Ok(Self { attributes }),
            Value::Null => Ok(Self::new()),
            other => Err(ProviderError::Validation(format!(
                "resource state must be an object, got {}",
                other
            ))),
        }
    }

    /// Raw attribute value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).filter(|v| !v.is_null())
    }

    /// String attribute, or `""` when absent, null or not a string.
    pub fn get_string(&self, name: &str) -> String {
        self.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Set an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// The local identifier, if the resource exists.
    pub fn id(&self) -> Option<&str> {
        self.get(ID_ATTRIBUTE)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    /// Set the local identifier. An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set(ID_ATTRIBUTE, id.into());
    }

    /// Mark the resource as gone.
    pub fn clear_id(&mut self) {
        self.set_id("");
    }

    /// Convert back into a state value for the host.
    pub fn into_state(self) -> Value {
        if self.id().is_none() {
            return Value::Null;
        }
        Value::Object(self.attributes)
    }
}
