//! Specimen processing steps
//!
//! A step has no rendering of its own: each present member is rendered by
//! the kind its descriptor declares, under `<name>_<member>`.

use super::{as_object, is_empty, render_named, FlatPair, RenderContext};
use crate::error::{Error, Result};
use serde_json::Value;

const PROCESSING_TYPE: &str = "SpecimenProcessing";

pub(crate) fn specimen_processing(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let step = as_object(ctx, value, name)?;
    let descriptor = ctx
        .table
        .get(PROCESSING_TYPE)
        .ok_or_else(|| Error::UnsupportedValueKind {
            path: ctx.path(name),
            kind: PROCESSING_TYPE.to_string(),
        })?;

    let mut pairs = Vec::new();
    for member in &descriptor.fields {
        let Some(member_value) = step.get(&member.name) else {
            continue;
        };
        if is_empty(member_value) {
            continue;
        }
        if !member.kind.is_supported() {
            tracing::trace!(member = %member.name, kind = %member.kind, "processing member not rendered");
            continue;
        }
        let member_name = format!("{}_{}", name, member.name);
        pairs.extend(render_named(ctx, &member.kind, member_value, &member_name)?);
    }
    Ok(pairs)
}
