//! Coded components: observation components and task parameters
//!
//! Each element is named after its own concept (`code` for components,
//! `type` for task inputs and outputs), and its `value[x]` is rendered under
//! that name: a component coded "Systolic Blood Pressure" holding a quantity
//! yields `systolic_blood_pressure`, `systolic_blood_pressure_value` and
//! `systolic_blood_pressure_unit`.

use super::{as_object, choice_value, is_empty, render_value, sanitize_name, str_member, FlatPair, RenderContext};
use crate::error::Result;
use serde_json::{Map, Value};

pub(crate) fn render(
    ctx: &RenderContext<'_>,
    items: &[Value],
    name: &str,
    concept_key: &str,
) -> Result<Vec<FlatPair>> {
    let mut pairs = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if is_empty(item) {
            continue;
        }
        let component = as_object(ctx, item, name)?;
        let Some((key, value, kind)) = choice_value(component) else {
            continue;
        };

        let prefix = match component.get(concept_key) {
            Some(concept) if !is_empty(concept) => label(as_object(ctx, concept, name)?),
            _ => None,
        }
        .unwrap_or_else(|| format!("{}_{}", name, index));

        for (part, part_value) in render_value(ctx, &kind, value, key)? {
            // drop the `value<Type>` segment
            let rest = part.split_once('_').map(|(_, rest)| rest).unwrap_or("");
            let flat = format!("{}_{}", prefix, rest);
            let flat = flat.strip_suffix('_').unwrap_or(&flat).to_string();
            pairs.push((flat, part_value));
        }
    }
    Ok(pairs)
}

/// First coding display, else the concept text, else the first code;
/// lower-cased and made a valid identifier. Blank candidates are passed over.
fn label(concept: &Map<String, Value>) -> Option<String> {
    let codings: Vec<&Map<String, Value>> = concept
        .get("coding")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    let displays = codings.iter().filter_map(|coding| str_member(coding, "display"));
    let text = str_member(concept, "text");
    let codes = codings.iter().filter_map(|coding| str_member(coding, "code"));

    displays
        .chain(text)
        .chain(codes)
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(|candidate| sanitize_name(&candidate.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_context;
    use serde_json::json;

    fn ctx() -> RenderContext<'static> {
        test_context("Task", 8)
    }

    #[test]
    fn test_task_input_named_by_type() {
        let inputs = json!([
            {"type": {"text": "Input File"}, "valueReference": {"reference": "DocumentReference/d1"}},
            {"type": {"coding": [{"code": "max-reads"}]}, "valueInteger": 1000}
        ]);
        let pairs = render(&ctx(), inputs.as_array().unwrap(), "input", "type").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("input_file".to_string(), json!("DocumentReference/d1")),
                ("max_reads".to_string(), json!(1000)),
            ]
        );
    }

    #[test]
    fn test_uncoded_component_falls_back_to_position() {
        let components = json!([{"valueString": "positive"}]);
        let pairs = render(&ctx(), components.as_array().unwrap(), "component", "code").unwrap();
        assert_eq!(pairs, vec![("component_0".to_string(), json!("positive"))]);
    }

    #[test]
    fn test_blank_labels_fall_back() {
        let components = json!([
            {"code": {"text": " "}, "valueString": "x"},
            {"code": {"coding": [{"display": "  ", "code": "LA6576-8"}]}, "valueString": "y"}
        ]);
        let pairs = render(&ctx(), components.as_array().unwrap(), "component", "code").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("component_0".to_string(), json!("x")),
                ("la6576_8".to_string(), json!("y")),
            ]
        );
    }

    #[test]
    fn test_component_without_value_is_skipped() {
        let components = json!([{"code": {"text": "Heart rate"}, "dataAbsentReason": {"text": "asked"}}]);
        let pairs = render(&ctx(), components.as_array().unwrap(), "component", "code").unwrap();
        assert!(pairs.is_empty());
    }
}
