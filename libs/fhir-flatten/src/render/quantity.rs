//! Measured values

use super::{as_object, str_member, token, FlatPair, RenderContext};
use crate::error::Result;
use serde_json::{Map, Value};

/// `<name>` = `"<value> <unit>"`, `<name>_value` = the numeric value,
/// `<name>_unit` = `"<system>#<unit>"`
pub(crate) fn quantity(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    let quantity = as_object(ctx, value, name)?;
    let number = numeric_member(ctx, quantity, name)?;
    let unit = str_member(quantity, "unit").or_else(|| str_member(quantity, "code"));

    let mut pairs = Vec::new();
    if let Some(number) = number {
        let label = match unit {
            Some(unit) => format!("{} {}", number, unit),
            None => number.to_string(),
        };
        pairs.push((name.to_string(), Value::String(label)));
        let float = float(number).ok_or_else(|| ctx.invalid(name, "finite number"))?;
        pairs.push((format!("{}_value", name), float));
    }
    if unit.is_some() {
        let system = str_member(quantity, "system");
        pairs.push((format!("{}_unit", name), Value::String(token(system, unit))));
    }
    Ok(pairs)
}

/// Age renders as its numeric value
pub(crate) fn age(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    let age = as_object(ctx, value, name)?;
    match numeric_member(ctx, age, name)? {
        Some(number) => {
            let float = float(number).ok_or_else(|| ctx.invalid(name, "finite number"))?;
            Ok(vec![(name.to_string(), float)])
        }
        None => Ok(Vec::new()),
    }
}

pub(crate) fn decimal(ctx: &RenderContext<'_>, value: &Value, name: &str) -> Result<Vec<FlatPair>> {
    match value {
        Value::Number(number) => float(number)
            .map(|float| vec![(name.to_string(), float)])
            .ok_or_else(|| ctx.invalid(name, "decimal")),
        _ => Err(ctx.invalid(name, "decimal")),
    }
}

/// The raw `data` payload
pub(crate) fn sampled_data(
    ctx: &RenderContext<'_>,
    value: &Value,
    name: &str,
) -> Result<Vec<FlatPair>> {
    let sampled = as_object(ctx, value, name)?;
    Ok(str_member(sampled, "data")
        .map(|data| vec![(name.to_string(), Value::from(data))])
        .unwrap_or_default())
}

fn numeric_member<'v>(
    ctx: &RenderContext<'_>,
    obj: &'v Map<String, Value>,
    name: &str,
) -> Result<Option<&'v serde_json::Number>> {
    match obj.get("value") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(Some(number)),
        Some(_) => Err(ctx.invalid(name, "numeric value")),
    }
}

fn float(number: &serde_json::Number) -> Option<Value> {
    number
        .as_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_context;
    use serde_json::json;

    fn ctx() -> RenderContext<'static> {
        test_context("Observation", 8)
    }

    #[test]
    fn test_quantity() {
        let value = json!({"value": 6.3, "unit": "mmol/l", "system": "http://unitsofmeasure.org", "code": "mmol/L"});
        let pairs = quantity(&ctx(), &value, "valueQuantity").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("valueQuantity".to_string(), json!("6.3 mmol/l")),
                ("valueQuantity_value".to_string(), json!(6.3)),
                ("valueQuantity_unit".to_string(), json!("http://unitsofmeasure.org#mmol/l")),
            ]
        );
    }

    #[test]
    fn test_quantity_value_is_float() {
        let pairs = quantity(&ctx(), &json!({"value": 120}), "valueQuantity").unwrap();
        assert_eq!(pairs[0].1, json!("120"));
        assert_eq!(pairs[1].1, json!(120.0));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_quantity_value_must_be_numeric() {
        assert!(quantity(&ctx(), &json!({"value": "high"}), "valueQuantity").is_err());
    }

    #[test]
    fn test_age_and_decimal() {
        assert_eq!(
            age(&ctx(), &json!({"value": 42, "unit": "yr"}), "onsetAge").unwrap(),
            vec![("onsetAge".to_string(), json!(42.0))]
        );
        assert_eq!(
            decimal(&ctx(), &json!(0.75), "valueDecimal").unwrap(),
            vec![("valueDecimal".to_string(), json!(0.75))]
        );
        assert!(decimal(&ctx(), &json!("0.75"), "valueDecimal").is_err());
    }
}
