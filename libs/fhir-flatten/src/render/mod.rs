//! Value rendering
//!
//! One rule per [`ValueKind`]. Each rule turns a single value into ordered
//! `(flat name, scalar)` pairs; list handling and naming live here.

mod codes;
mod components;
mod dates;
mod extension;
mod people;
mod processing;
mod quantity;

use crate::error::{Error, Result};
use ferrum_models::{DescriptorTable, FieldDescriptor, ScalarKind, ValueKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub(crate) use dates::{normalize_date, normalize_date_time};

/// A flat field name and its scalar value
pub(crate) type FlatPair = (String, Value);

static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("identifier regex must compile"));

/// Per-record rendering settings
#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderContext<'a> {
    pub type_name: &'a str,
    /// Looked up for the members of backbone kinds
    pub table: &'a DescriptorTable,
    pub identifier_slots: usize,
}

impl RenderContext<'_> {
    pub fn path(&self, name: &str) -> String {
        format!("{}.{}", self.type_name, name)
    }

    pub fn invalid(&self, name: &str, expected: &str) -> Error {
        Error::invalid(self.path(name), expected)
    }
}

/// Render one field of a resource
pub(crate) fn render_field(
    ctx: &RenderContext<'_>,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<Vec<FlatPair>> {
    render_named(ctx, &field.kind, value, &field.name)
}

/// Render a value that may be a list, naming list elements by position
/// unless the kind names them by content
pub(crate) fn render_named(
    ctx: &RenderContext<'_>,
    kind: &ValueKind,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    match value {
        Value::Array(items) if kind.names_from_content() => render_named_by_content(ctx, kind, items, name),
        Value::Array(items) => {
            let mut pairs = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if is_empty(item) {
                    continue;
                }
                let slot = slot_name(kind, name, i, ctx.identifier_slots);
                pairs.extend(render_value(ctx, kind, item, &slot)?);
            }
            Ok(pairs)
        }
        _ => render_value(ctx, kind, value, name),
    }
}

/// Name of list element `index`: the bare name first, then `<name>_<index>`.
/// Identifiers beyond the slot count share the last slot.
fn slot_name(kind: &ValueKind, name: &str, index: usize, slots: usize) -> String {
    let index = match kind {
        ValueKind::Identifier => index.min(slots.saturating_sub(1)),
        _ => index,
    };
    if index == 0 {
        name.to_string()
    } else {
        format!("{}_{}", name, index)
    }
}

fn render_named_by_content(
    ctx: &RenderContext<'_>,
    kind: &ValueKind,
    items: &[Value],
    name: &str,
) -> Result<Vec<FlatPair>> {
    match kind {
        ValueKind::Extension => extension::render(ctx, items, name),
        ValueKind::ObservationComponent => components::render(ctx, items, name, "code"),
        ValueKind::TaskInput | ValueKind::TaskOutput => components::render(ctx, items, name, "type"),
        _ => Err(ctx.invalid(name, "content-named value")),
    }
}

/// Render a single (non-list) value of a given kind
pub(crate) fn render_value(
    ctx: &RenderContext<'_>,
    kind: &ValueKind,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    if is_empty(value) {
        return Ok(Vec::new());
    }

    match kind {
        ValueKind::Scalar(scalar) => render_scalar(ctx, *scalar, value, name),
        ValueKind::CodeableConcept => codes::codeable_concept(ctx, value, name),
        ValueKind::Coding => codes::coding(ctx, value, name),
        ValueKind::Identifier => codes::identifier(ctx, value, name),
        ValueKind::PatientCommunication => codes::patient_communication(ctx, value, name),
        ValueKind::FamilyMemberHistoryCondition => codes::family_member_condition(ctx, value, name),
        ValueKind::HumanName => people::human_name(ctx, value, name),
        ValueKind::Address => people::address(ctx, value, name),
        ValueKind::ContactPoint => people::contact_point(ctx, value, name),
        ValueKind::Reference => people::reference(ctx, value, name),
        ValueKind::CodeableReference => people::codeable_reference(ctx, value, name),
        ValueKind::DocumentReferenceContent => people::document_content(ctx, value, name),
        ValueKind::Quantity => quantity::quantity(ctx, value, name),
        ValueKind::Age => quantity::age(ctx, value, name),
        ValueKind::Decimal => quantity::decimal(ctx, value, name),
        ValueKind::SampledData => quantity::sampled_data(ctx, value, name),
        ValueKind::SpecimenProcessing => processing::specimen_processing(ctx, value, name),
        ValueKind::Extension | ValueKind::ObservationComponent | ValueKind::TaskInput | ValueKind::TaskOutput => {
            render_named_by_content(ctx, kind, std::slice::from_ref(value), name)
        }
        ValueKind::Unsupported(code) => Err(Error::UnsupportedValueKind {
            path: ctx.path(name),
            kind: code.clone(),
        }),
    }
}

fn render_scalar(
    ctx: &RenderContext<'_>,
    scalar: ScalarKind,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let rendered = match (scalar, value) {
        (ScalarKind::String, Value::String(_))
        | (ScalarKind::Number, Value::Number(_))
        | (ScalarKind::Bool, Value::Bool(_)) => value.clone(),
        (ScalarKind::Date, Value::String(s)) => {
            Value::String(normalize_date(s).ok_or_else(|| ctx.invalid(name, "date"))?)
        }
        (ScalarKind::DateTime, Value::String(s)) => {
            Value::String(normalize_date_time(s).ok_or_else(|| ctx.invalid(name, "dateTime"))?)
        }
        (ScalarKind::String, _) => return Err(ctx.invalid(name, "string")),
        (ScalarKind::Number, _) => return Err(ctx.invalid(name, "number")),
        (ScalarKind::Bool, _) => return Err(ctx.invalid(name, "boolean")),
        (ScalarKind::Date | ScalarKind::DateTime, _) => return Err(ctx.invalid(name, "date string")),
    };
    Ok(vec![(name.to_string(), rendered)])
}

/// Absent-equivalent values: `null`, `{}` and `[]`
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

pub(crate) fn as_object<'v>(
    ctx: &RenderContext<'_>,
    value: &'v Value,
    name: &str,
) -> Result<&'v Map<String, Value>> {
    value.as_object().ok_or_else(|| ctx.invalid(name, "object"))
}

/// Non-empty string member of an object
pub(crate) fn str_member<'v>(obj: &'v Map<String, Value>, key: &str) -> Option<&'v str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// `<system>#<code>`; a missing system renders as an empty prefix
pub(crate) fn token(system: Option<&str>, code: Option<&str>) -> String {
    format!("{}#{}", system.unwrap_or(""), code.unwrap_or(""))
}

/// The `value[x]` member of an element: its key, value and kind
pub(crate) fn choice_value(obj: &Map<String, Value>) -> Option<(&str, &Value, ValueKind)> {
    obj.iter().find_map(|(key, value)| {
        let suffix = key.strip_prefix("value")?;
        if !suffix.starts_with(|c: char| c.is_ascii_uppercase()) || is_empty(value) {
            return None;
        }
        Some((key.as_str(), value, ValueKind::from_choice_suffix(suffix)))
    })
}

/// Make a flat name a valid identifier
pub(crate) fn sanitize_name(name: &str) -> String {
    let cleaned = NON_IDENTIFIER.replace_all(name, "_");
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", cleaned)
    } else {
        cleaned.into_owned()
    }
}

#[cfg(test)]
pub(crate) fn test_context(type_name: &'static str, identifier_slots: usize) -> RenderContext<'static> {
    static EMPTY: Lazy<DescriptorTable> = Lazy::new(DescriptorTable::new);
    RenderContext {
        type_name,
        table: &EMPTY,
        identifier_slots,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> RenderContext<'static> {
        test_context("Patient", 3)
    }

    #[test]
    fn test_slot_names() {
        assert_eq!(slot_name(&ValueKind::HumanName, "name", 0, 3), "name");
        assert_eq!(slot_name(&ValueKind::HumanName, "name", 5, 3), "name_5");
        assert_eq!(slot_name(&ValueKind::Identifier, "identifier", 1, 3), "identifier_1");
        assert_eq!(slot_name(&ValueKind::Identifier, "identifier", 5, 3), "identifier_2");
    }

    #[test]
    fn test_scalar_shape_mismatch() {
        let err = render_value(&ctx(), &ValueKind::Scalar(ScalarKind::Bool), &json!("yes"), "active")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref path, .. } if path == "Patient.active"));
    }

    #[test]
    fn test_choice_value_skips_plain_value_keys() {
        let obj = json!({"value": 3, "valueString": "x"});
        let (key, value, kind) = choice_value(obj.as_object().unwrap()).unwrap();
        assert_eq!(key, "valueString");
        assert_eq!(value, &json!("x"));
        assert_eq!(kind, ValueKind::Scalar(ScalarKind::String));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("us-core.race"), "us_core_race");
        assert_eq!(sanitize_name("8480-6"), "_8480_6");
    }
}
