//! Loader for FHIR StructureDefinitions
//!
//! Extracts resource type descriptors from StructureDefinition snapshots. Each
//! resource yields one descriptor for itself and one per backbone element,
//! named `<Type><Field>` (e.g., `ObservationComponent`), so that shapes nested
//! inside a resource are described the same way as the resource itself.

use crate::bundle::Bundle;
use crate::descriptor::{DescriptorTable, FieldDescriptor, Multiplicity, ResourceTypeDescriptor};
use crate::error::{Error, Result};
use crate::value_kind::ValueKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Build a descriptor table from a set of conformance resources.
///
/// Values may be StructureDefinitions, Bundles of them, or arrays of either.
/// Anything that is not a non-abstract resource StructureDefinition is skipped.
pub fn parse_resources<'a, I>(resources: I) -> DescriptorTable
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut table = DescriptorTable::new();
    for resource in resources {
        collect_into(resource, &mut table);
    }
    table
}

fn collect_into(value: &Value, table: &mut DescriptorTable) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_into(item, table);
            }
        }
        Value::Object(_) if Bundle::is_bundle(value) => {
            if let Some(entries) = value.get("entry").and_then(Value::as_array) {
                for entry in entries {
                    if let Some(resource) = entry.get("resource") {
                        collect_into(resource, table);
                    }
                }
            }
        }
        Value::Object(_) => {
            if value.get("resourceType").and_then(Value::as_str) != Some("StructureDefinition") {
                return;
            }
            match parse_structure_definition(value) {
                Ok(descriptors) => {
                    for descriptor in descriptors {
                        table.add_type(descriptor);
                    }
                }
                Err(err) => tracing::debug!(error = %err, "skipping StructureDefinition"),
            }
        }
        _ => {}
    }
}

/// Load every `*.json` file in a directory (non-recursive)
pub fn load_dir(dir: &Path) -> Result<DescriptorTable> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    let mut table = DescriptorTable::new();
    for path in paths {
        let json = fs::read_to_string(&path)?;
        let value: Value = serde_json::from_str(&json)?;
        collect_into(&value, &mut table);
    }

    tracing::info!(dir = %dir.display(), types = table.len(), "loaded type descriptors");
    Ok(table)
}

/// Parse a single resource StructureDefinition into its descriptors.
///
/// The first descriptor is the resource itself, followed by its backbone
/// elements in path order.
pub fn parse_structure_definition(sd: &Value) -> Result<Vec<ResourceTypeDescriptor>> {
    let name = sd
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidStructureDefinition("missing 'name'".to_string()))?
        .to_string();

    if sd.get("kind").and_then(Value::as_str) != Some("resource") {
        return Err(Error::InvalidStructureDefinition(format!(
            "{} is not a resource definition",
            name
        )));
    }
    if sd.get("abstract").and_then(Value::as_bool).unwrap_or(false) {
        return Err(Error::InvalidStructureDefinition(format!(
            "{} is abstract",
            name
        )));
    }
    // Profiles constrain a base type; only base definitions describe shapes
    if sd.get("derivation").and_then(Value::as_str) == Some("constraint") {
        return Err(Error::InvalidStructureDefinition(format!(
            "{} is a profile",
            name
        )));
    }

    let type_name = sd
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or(&name)
        .to_string();

    let elements = sd
        .get("snapshot")
        .and_then(|s| s.get("element"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::InvalidStructureDefinition(format!("{} snapshot missing 'element'", name))
        })?;

    let mut resource = ResourceTypeDescriptor::new(&type_name);
    resource.docstring = sd
        .get("description")
        .and_then(Value::as_str)
        .map(clean_docstring);

    let expected_prefix = format!("{}.", type_name);
    let mut backbones: BTreeMap<String, ResourceTypeDescriptor> = BTreeMap::new();
    let mut backbone_order: Vec<String> = Vec::new();

    for element in elements.iter().skip(1) {
        let path = element.get("path").and_then(Value::as_str).unwrap_or("");
        let Some(remainder) = path.strip_prefix(&expected_prefix) else {
            continue;
        };
        let parts: Vec<&str> = remainder.split('.').collect();

        match parts.as_slice() {
            [field] => {
                let fields = parse_element(element, field, &type_name)?;
                if is_backbone(element) {
                    let backbone_name = backbone_type_name(&type_name, field);
                    let mut backbone = ResourceTypeDescriptor::new(&backbone_name);
                    backbone.docstring = element_docstring(element);
                    backbones.insert(backbone_name.clone(), backbone);
                    backbone_order.push(backbone_name);
                }
                resource.fields.extend(fields);
            }
            [backbone_field, field] => {
                let backbone_name = backbone_type_name(&type_name, backbone_field);
                if let Some(backbone) = backbones.get_mut(&backbone_name) {
                    let fields = parse_element(element, field, &backbone_name)?;
                    backbone.fields.extend(fields);
                }
            }
            // Deeper nesting is not described
            _ => {}
        }
    }

    let mut descriptors = vec![resource];
    for name in backbone_order {
        if let Some(backbone) = backbones.remove(&name) {
            descriptors.push(backbone);
        }
    }
    Ok(descriptors)
}

fn is_backbone(element: &Value) -> bool {
    element
        .get("type")
        .and_then(Value::as_array)
        .and_then(|types| types.first())
        .and_then(|t| t.get("code"))
        .and_then(Value::as_str)
        .is_some_and(|code| code == "BackboneElement" || code == "Element")
}

/// Parse one element into one or more fields. Choice elements (`value[x]`)
/// expand into one field per allowed type.
fn parse_element(element: &Value, field: &str, owner: &str) -> Result<Vec<FieldDescriptor>> {
    let types = element
        .get("type")
        .and_then(Value::as_array)
        .map(|types| types.as_slice())
        .unwrap_or_default();

    // contentReference elements reuse another element's definition
    if types.is_empty() {
        return Ok(Vec::new());
    }

    let min = element.get("min").and_then(Value::as_u64).unwrap_or(0);
    let multiplicity = match element.get("max").and_then(Value::as_str) {
        Some("*") => Multiplicity::List,
        Some(n) => match n.parse::<u64>() {
            Ok(max) if max > 1 => Multiplicity::List,
            Ok(_) => Multiplicity::Single,
            Err(_) => {
                return Err(Error::InvalidStructureDefinition(format!(
                    "{}.{} has invalid max '{}'",
                    owner, field, n
                )))
            }
        },
        None => Multiplicity::Single,
    };
    let docstring = element_docstring(element);

    let make_field = |name: String, type_spec: &Value| -> Result<FieldDescriptor> {
        let code = type_code(type_spec)
            .ok_or_else(|| Error::InvalidStructureDefinition(format!("{}.{} type missing 'code'", owner, name)))?;
        let kind = if code == "BackboneElement" || code == "Element" {
            ValueKind::from_type_code(&backbone_type_name(owner, &name))
        } else {
            ValueKind::from_type_code(&code)
        };
        let target_types = type_spec
            .get("targetProfile")
            .and_then(Value::as_array)
            .map(|profiles| {
                profiles
                    .iter()
                    .filter_map(Value::as_str)
                    .map(extract_type_name_from_url)
                    .collect()
            })
            .unwrap_or_default();

        Ok(FieldDescriptor {
            name,
            kind,
            multiplicity,
            required: min > 0,
            target_types,
            docstring: docstring.clone(),
        })
    };

    if let Some(base) = field.strip_suffix("[x]") {
        types
            .iter()
            .map(|type_spec| {
                let code = type_code(type_spec).unwrap_or_default();
                make_field(format!("{}{}", base, capitalize_first(&code)), type_spec)
            })
            .collect()
    } else {
        Ok(vec![make_field(field.to_string(), &types[0])?])
    }
}

/// Type code of an element type, with FHIRPath system types mapped back to
/// their FHIR primitive names
fn type_code(type_spec: &Value) -> Option<String> {
    let code = type_spec.get("code").and_then(Value::as_str)?;
    let code = match code.strip_prefix("http://hl7.org/fhirpath/System.") {
        Some("String") => "string",
        Some("Boolean") => "boolean",
        Some("Integer") => "integer",
        Some("Decimal") => "decimal",
        Some("Date") => "date",
        Some("DateTime") => "dateTime",
        Some("Time") => "time",
        Some(other) => other,
        None => code,
    };
    Some(code.to_string())
}

fn element_docstring(element: &Value) -> Option<String> {
    element
        .get("short")
        .and_then(Value::as_str)
        .or_else(|| element.get("definition").and_then(Value::as_str))
        .map(clean_docstring)
}

fn clean_docstring(doc: &str) -> String {
    doc.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name of the type describing a backbone element
/// E.g., ("Observation", "component") -> "ObservationComponent"
pub fn backbone_type_name(owner: &str, field: &str) -> String {
    format!("{}{}", owner, capitalize_first(field))
}

/// Capitalize the first letter of a string
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Extract the type name from a canonical URL
/// E.g., "http://hl7.org/fhir/StructureDefinition/Patient" -> "Patient"
pub fn extract_type_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_type_name_from_url() {
        assert_eq!(
            extract_type_name_from_url("http://hl7.org/fhir/StructureDefinition/Patient"),
            "Patient"
        );
        assert_eq!(extract_type_name_from_url("Patient"), "Patient");
    }

    #[test]
    fn test_backbone_type_name() {
        assert_eq!(backbone_type_name("Task", "input"), "TaskInput");
    }

    #[test]
    fn test_system_type_codes() {
        let spec = serde_json::json!({"code": "http://hl7.org/fhirpath/System.String"});
        assert_eq!(type_code(&spec).as_deref(), Some("string"));
    }

    #[test]
    fn test_clean_docstring() {
        assert_eq!(clean_docstring("Who  and/or\n what"), "Who and/or what");
    }
}
