//! Schema-driven planning.
//!
//! A plan compares the prior state of a resource with the configuration the
//! user now declares. Only configurable attributes are compared. A change to
//! any `force_new` attribute turns the plan into a replacement, which the
//! host applies as delete followed by create.

use serde_json::{Map, Value};

use crate::schema::{Attribute, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Placeholder shown in place of sensitive values.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// Plan a resource against its schema.
///
/// - `prior` of `None` or null plans a create; computed attributes stay unknown.
/// - `proposed` of null plans a destroy.
/// - Otherwise an update; computed attributes carry over from `prior` unless
///   the resource is replaced.
///
/// Missing, null and (for optional attributes) empty-string values are all
/// treated as unset.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    match prior.filter(|v| !v.is_null()) {
        None => plan_create(schema, proposed),
        Some(prior) if proposed.is_null() => plan_destroy(schema, prior),
        Some(prior) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();

    for (name, attr) in configurable(schema) {
        if let Some(value) = attr_value(proposed, name, attr) {
            planned.insert(name.to_string(), value.clone());
            changes.push(AttributeChange::added(name, shown(attr, value)));
        }
    }

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = Map::new();
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in configurable(schema) {
        let before = attr_value(prior, name, attr);
        let after = attr_value(proposed, name, attr);

        if let Some(value) = after {
            planned.insert(name.to_string(), value.clone());
        }
        if before != after {
            requires_replace |= attr.force_new;
            changes.push(match (before, after) {
                (Some(b), Some(a)) => AttributeChange::modified(name, shown(attr, b), shown(attr, a)),
                (b, a) => AttributeChange::new(name, b.map(|v| shown(attr, v)), a.map(|v| shown(attr, v))),
            });
        }
    }

    if !requires_replace {
        for (name, attr) in schema.sorted_attributes() {
            if !attr.flags.is_computed_only() {
                continue;
            }
            if let Some(value) = prior.get(name).filter(|v| !v.is_null()) {
                planned.insert(name.to_string(), value.clone());
            }
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(Value::Object(planned));
    }
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn plan_destroy(schema: &Schema, prior: &Value) -> PlanResult {
    let changes = configurable(schema)
        .filter_map(|(name, attr)| {
            attr_value(prior, name, attr).map(|v| AttributeChange::removed(name, shown(attr, v)))
        })
        .collect();

    PlanResult::with_changes(Value::Null, changes, false)
}

fn configurable(schema: &Schema) -> impl Iterator<Item = (&str, &Attribute)> {
    schema
        .sorted_attributes()
        .into_iter()
        .filter(|(_, attr)| !attr.flags.is_computed_only())
}

fn attr_value<'a>(state: &'a Value, name: &str, attr: &Attribute) -> Option<&'a Value> {
    state.get(name).filter(|v| match v {
        Value::Null => false,
        Value::String(s) if s.is_empty() => attr.flags.required,
        _ => true,
    })
}

fn shown(attr: &Attribute, value: &Value) -> Value {
    if attr.flags.sensitive {
        Value::String(SENSITIVE_PLACEHOLDER.to_string())
    } else {
        value.clone()
    }
}
