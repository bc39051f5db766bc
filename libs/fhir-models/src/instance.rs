//! Resource instances
//!
//! A runtime value tree for one resource, conforming to one
//! [`ResourceTypeDescriptor`](crate::ResourceTypeDescriptor).

use crate::error::{Error, Result};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInstance {
    resource_type: String,
    id: String,
    body: Map<String, Value>,
}

impl ResourceInstance {
    /// Wrap a parsed JSON resource. `resourceType` and `id` must be present.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(body) = value else {
            return Err(Error::InvalidResource(
                "resource must be a JSON object".to_string(),
            ));
        };

        let resource_type = body
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingField("resourceType".to_string()))?
            .to_string();

        let id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::MissingField(format!("{}.id", resource_type)))?
            .to_string();

        Ok(Self {
            resource_type,
            id,
            body,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value of a top-level field, if present
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}

impl TryFrom<Value> for ResourceInstance {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let instance =
            ResourceInstance::from_value(json!({"resourceType": "Patient", "id": "p1"})).unwrap();
        assert_eq!(instance.resource_type(), "Patient");
        assert_eq!(instance.id(), "p1");
        assert!(instance.get("name").is_none());
    }

    #[test]
    fn test_missing_id() {
        let err = ResourceInstance::from_value(json!({"resourceType": "Patient"})).unwrap_err();
        assert!(matches!(err, Error::MissingField(field) if field == "Patient.id"));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            ResourceInstance::from_value(json!(["Patient"])),
            Err(Error::InvalidResource(_))
        ));
    }
}
