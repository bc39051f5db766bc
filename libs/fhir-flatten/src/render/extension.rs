//! Extensions
//!
//! An extension is named after the last segment of its url. Its `value[x]`
//! is rendered under the choice key, which is then shortened:
//!
//! | rendered name         | becomes  |
//! |-----------------------|----------|
//! | `valueCoding_display` | (empty)  |
//! | `valueString`         | (empty)  |
//! | `valueCoding`         | `coding` |
//! | `valueCode`           | `code`   |
//!
//! so a US Core race extension yields `us_core_race`, `us_core_race_coding`
//! and `us_core_race_coding_coding`. Nested extensions are followed one level
//! down; anything deeper is cut.

use super::{as_object, choice_value, is_empty, render_value, sanitize_name, FlatPair, RenderContext};
use crate::error::Result;
use serde_json::{Map, Value};

const MAX_DEPTH: usize = 2;

const REWRITES: [(&str, &str); 4] = [
    ("valueCoding_display", ""),
    ("valueString", ""),
    ("valueCoding", "coding"),
    ("valueCode", "code"),
];

pub(crate) fn render(ctx: &RenderContext<'_>, items: &[Value], name: &str) -> Result<Vec<FlatPair>> {
    render_at(ctx, items, name, 0)
}

fn render_at(
    ctx: &RenderContext<'_>,
    items: &[Value],
    name: &str,
    depth: usize,
) -> Result<Vec<FlatPair>> {
    if depth == MAX_DEPTH {
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for item in items.iter().filter(|item| !is_empty(item)) {
        let extension = as_object(ctx, item, name)?;
        let ext_name = extension_name(extension).ok_or_else(|| ctx.invalid(name, "extension url"))?;

        if let Some((key, value, kind)) = choice_value(extension) {
            for (part, part_value) in render_value(ctx, &kind, value, key)? {
                let part = shorten(&part);
                let flat = if depth == 0 {
                    format!("{}{}", ext_name, part)
                } else {
                    part
                };
                pairs.push((flat, part_value));
            }
        } else if let Some(children) = extension.get("extension") {
            let children = children
                .as_array()
                .ok_or_else(|| ctx.invalid(name, "extension list"))?;
            for (child, child_value) in render_at(ctx, children, &ext_name, depth + 1)? {
                pairs.push((format!("{}{}", ext_name, shorten(&child)), child_value));
            }
        }
    }
    Ok(pairs)
}

/// Last url segment, dashes as underscores
fn extension_name(extension: &Map<String, Value>) -> Option<String> {
    let url = extension.get("url").and_then(Value::as_str)?;
    let segment = url.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(sanitize_name(&segment.replace('-', "_")))
}

fn shorten(name: &str) -> String {
    let shortened = REWRITES
        .iter()
        .fold(name.to_string(), |acc, (from, to)| acc.replace(from, to));
    if shortened.is_empty() {
        shortened
    } else {
        format!("_{}", shortened).replace("__", "_")
    }
}
