//! Names, addresses, contact points and references

use super::{as_object, extension, is_empty, str_member, FlatPair, RenderContext};
use crate::error::Result;
use serde_json::{Map, Value};

/// `"<family> <given...>"`, or the name text when neither part is present
pub(crate) fn human_name(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let human_name = as_object(ctx, value, name)?;
    let mut parts: Vec<&str> = str_member(human_name, "family").into_iter().collect();
    parts.extend(strings(ctx, human_name, "given", name)?);

    let rendered = if parts.is_empty() {
        str_member(human_name, "text").map(str::to_string)
    } else {
        Some(parts.join(" "))
    };
    Ok(rendered
        .map(|rendered| vec![(name.to_string(), Value::String(rendered))])
        .unwrap_or_default())
}

/// Address lines, city, postal code and country joined by spaces. Address
/// extensions come first, prefixed with the field name.
pub(crate) fn address(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    let address = as_object(ctx, value, name)?;
    let mut pairs = Vec::new();

    match address.get("extension") {
        Some(Value::Array(items)) => {
            for (ext_name, ext_value) in extension::render(ctx, items, name)? {
                pairs.push((format!("{}_{}", name, ext_name), ext_value));
            }
        }
        Some(other) if !is_empty(other) => return Err(ctx.invalid(name, "extension list")),
        _ => {}
    }

    let mut parts = strings(ctx, address, "line", name)?;
    parts.extend(
        ["city", "postalCode", "country"]
            .into_iter()
            .filter_map(|key| str_member(address, key)),
    );
    if !parts.is_empty() {
        pairs.push((name.to_string(), Value::String(parts.join(" "))));
    }
    Ok(pairs)
}

/// `"<system>:<use>:<value>"`
pub(crate) fn contact_point(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let contact = as_object(ctx, value, name)?;
    let part = |key| str_member(contact, key).unwrap_or("");
    Ok(vec![(
        name.to_string(),
        Value::String(format!("{}:{}:{}", part("system"), part("use"), part("value"))),
    )])
}

/// The raw reference string. References carrying only an identifier or a
/// display render nothing.
pub(crate) fn reference(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    let reference = as_object(ctx, value, name)?;
    Ok(str_member(reference, "reference")
        .map(|target| vec![(name.to_string(), Value::from(target))])
        .unwrap_or_default())
}

pub(crate) fn codeable_reference(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let codeable = as_object(ctx, value, name)?;
    match codeable.get("reference") {
        Some(inner) if !is_empty(inner) => reference(ctx, inner, name),
        _ => Ok(Vec::new()),
    }
}

/// `<name>_url`: the attachment url, or its inline data as a data url
pub(crate) fn document_content(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let content = as_object(ctx, value, name)?;
    let Some(attachment) = content.get("attachment") else {
        return Ok(Vec::new());
    };
    let attachment = as_object(ctx, attachment, name)?;

    let url = str_member(attachment, "url")
        .map(str::to_string)
        .or_else(|| str_member(attachment, "data").map(|data| format!("data:,{}", data)));
    Ok(url
        .map(|url| vec![(format!("{}_url", name), Value::String(url))])
        .unwrap_or_default())
}

/// Non-empty strings of a string-list member
fn strings<'v>(
    ctx: &RenderContext<'_>,
    obj: &'v Map<String, Value>,
    key: &str,
    name: &str,
) -> Result<Vec<&'v str>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| item.as_str().ok_or_else(|| ctx.invalid(name, "string list")))
            .filter(|part| !matches!(part, Ok("")))
            .collect(),
        Some(_) => Err(ctx.invalid(name, "string list")),
    }
}
