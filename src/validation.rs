//! Validation of configuration values against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use hemmer_provider_gitlab::schema::{Attribute, Schema};
//! use hemmer_provider_gitlab::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("project", Attribute::required_string())
//!     .with_attribute("insecure", Attribute::optional_bool());
//!
//! assert!(validate(&schema, &json!({"project": "42"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"project": "42", "insecure": "yes"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("insecure"));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a configuration value against a schema.
///
/// Rules:
/// - the value must be an object (null is treated as an empty object)
/// - required attributes must be present and non-null
/// - present attributes must have the declared type
/// - computed-only attributes are ignored
/// - attributes unknown to the schema are reported
///
/// An empty result means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let empty = serde_json::Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return vec![Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(other)))];
        },
    };

    let mut diagnostics = Vec::new();
    for (name, attr) in schema.sorted_attributes() {
        validate_attribute(name, attr, obj.get(name), &mut diagnostics);
    }

    let mut unknown: Vec<_> = obj
        .keys()
        .filter(|key| schema.attribute(key).is_none())
        .collect();
    unknown.sort();
    for key in unknown {
        diagnostics.push(
            Diagnostic::error(format!("Unsupported attribute '{}'", key))
                .with_detail("This attribute is not declared in the schema")
                .with_attribute(key.as_str()),
        );
    }

    diagnostics
}

/// Like [`validate`], but returns `Err` with the diagnostics when invalid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// True if `value` is valid against `schema`.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    name: &str,
    attr: &Attribute,
    value: Option<&Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", name))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(name),
                );
            }
        },
        Some(v) if !matches_type(attr.attr_type, v) => {
            diagnostics.push(
                Diagnostic::error(format!("Invalid type for attribute '{}'", name))
                    .with_detail(format!(
                        "Expected {}, got {}",
                        attr.attr_type.name(),
                        value_type_name(v)
                    ))
                    .with_attribute(name),
            );
        },
        Some(_) => {},
    }
}

fn matches_type(attr_type: AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Bool => value.is_boolean(),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::v0()
            .with_attribute("project", Attribute::required_string())
            .with_attribute("google_iap_audience_client_id", Attribute::optional_string())
            .with_attribute("active", Attribute::computed_bool())
    }

    #[test]
    fn test_validate_required_string() {
        assert!(validate(&schema(), &json!({"project": "42"})).is_empty());

        let diagnostics = validate(&schema(), &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("project"));

        let diagnostics = validate(&schema(), &json!({"project": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema(), &json!({"project": 42}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Expected string, got number"));
    }

    #[test]
    fn test_validate_optional_attribute() {
        let s = schema();
        assert!(validate(&s, &json!({"project": "1", "google_iap_audience_client_id": "a"})).is_empty());
        assert!(validate(&s, &json!({"project": "1", "google_iap_audience_client_id": null})).is_empty());
        assert_eq!(
            validate(&s, &json!({"project": "1", "google_iap_audience_client_id": true})).len(),
            1
        );
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        // Hosts echo computed values back; their type is not checked.
        assert!(validate(&schema(), &json!({"project": "1", "active": "yes"})).is_empty());
    }

    #[test]
    fn test_validate_unknown_attribute() {
        let diagnostics = validate(&schema(), &json!({"project": "1", "api_ur": "typo"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Unsupported attribute 'api_ur'");
    }

    #[test]
    fn test_validate_null_and_non_object_root() {
        let diagnostics = validate(&schema(), &Value::Null);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("project"));

        let diagnostics = validate(&schema(), &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }

    #[test]
    fn test_multiple_errors_are_sorted() {
        let s = Schema::v0()
            .with_attribute("b", Attribute::required_string())
            .with_attribute("a", Attribute::required_string());
        let diagnostics = validate(&s, &json!({}));
        let attrs: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.as_deref()).collect();
        assert_eq!(attrs, vec!["a", "b"]);
    }

    #[test]
    fn test_helpers() {
        assert!(is_valid(&schema(), &json!({"project": "1"})));
        assert!(!is_valid(&schema(), &json!({})));
        assert_eq!(validate_result(&schema(), &json!({})).unwrap_err().len(), 1);
        assert!(validate_result(&schema(), &json!({"project": "1"})).is_ok());
    }
}
