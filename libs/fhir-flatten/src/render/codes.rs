//! Coded values: concepts, codings, identifiers

use super::{as_object, str_member, token, FlatPair, RenderContext};
use crate::error::Result;
use serde_json::{Map, Value};

/// `<name>` is the concept text, falling back to the first coding display;
/// `<name>_coding` repeats once per coding
pub(crate) fn codeable_concept(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let concept = as_object(ctx, value, name)?;
    let codings = codings(ctx, concept, name)?;

    let label = str_member(concept, "text")
        .or_else(|| codings.iter().find_map(|coding| str_member(coding, "display")));

    let mut pairs = Vec::new();
    if let Some(label) = label {
        pairs.push((name.to_string(), Value::from(label)));
    }
    let coding_name = format!("{}_coding", name);
    for coding in codings {
        if let Some(token) = coding_token(coding) {
            pairs.push((coding_name.clone(), Value::String(token)));
        }
    }
    Ok(pairs)
}

pub(crate) fn coding(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    let coding = as_object(ctx, value, name)?;
    let mut pairs = Vec::new();
    if let Some(display) = str_member(coding, "display") {
        pairs.push((name.to_string(), Value::from(display)));
    }
    if let Some(token) = coding_token(coding) {
        pairs.push((format!("{}_coding", name), Value::String(token)));
    }
    Ok(pairs)
}

/// `<system>#<value>`
pub(crate) fn identifier(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let identifier = as_object(ctx, value, name)?;
    let system = str_member(identifier, "system");
    let id_value = str_member(identifier, "value");
    if system.is_none() && id_value.is_none() {
        return Ok(Vec::new());
    }
    Ok(vec![(name.to_string(), Value::String(token(system, id_value)))])
}

/// Language of a patient communication entry, as a token
pub(crate) fn patient_communication(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let communication = as_object(ctx, value, name)?;
    let Some(language) = communication.get("language") else {
        return Ok(Vec::new());
    };
    let language = as_object(ctx, language, name)?;
    let first = codings(ctx, language, name)?
        .into_iter()
        .find_map(coding_token);

    Ok(first
        .map(|token| vec![(name.to_string(), Value::String(token))])
        .unwrap_or_default())
}

/// Condition of a family member history, rendered by its code
pub(crate) fn family_member_condition(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let condition = as_object(ctx, value, name)?;
    match condition.get("code") {
        Some(code) => codeable_concept(ctx, code, name),
        None => Ok(Vec::new()),
    }
}

fn codings<'v>(
    ctx: &RenderContext<'_>,
    concept: &'v Map<String, Value>,
    name: &str,
) -> Result<Vec<&'v Map<String, Value>>> {
    match concept.get("coding") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| as_object(ctx, item, name))
            .collect(),
        Some(_) => Err(ctx.invalid(name, "coding list")),
    }
}

fn coding_token(coding: &Map<String, Value>) -> Option<String> {
    let system = str_member(coding, "system");
    let code = str_member(coding, "code");
    if system.is_none() && code.is_none() {
        return None;
    }
    Some(token(system, code))
}
