//! FHIR Bundle model
//!
//! Only the parts needed to pull resources out of a Bundle; everything else is
//! kept in `extensions`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// FHIR Bundle resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Resource type - always "Bundle"
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Entry in the bundle - will have a resource or information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

/// Entry in the bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(flatten)]
    pub extensions: HashMap<String, Value>,
}

impl Bundle {
    /// Whether a JSON value is a Bundle resource
    pub fn is_bundle(value: &Value) -> bool {
        value.get("resourceType").and_then(Value::as_str) == Some("Bundle")
    }

    /// Consume the bundle, yielding entry resources in order
    pub fn into_resources(self) -> impl Iterator<Item = Value> {
        self.entry
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| entry.resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entry
            .iter()
            .flatten()
            .filter_map(|entry| entry.resource.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resources_skip_empty_entries() {
        let value = json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"fullUrl": "urn:uuid:1", "resource": {"resourceType": "Patient", "id": "1"}},
                {"fullUrl": "urn:uuid:2"}
            ]
        });
        assert!(Bundle::is_bundle(&value));
        let bundle: Bundle = serde_json::from_value(value).unwrap();
        assert_eq!(bundle.resources().count(), 1);
        let resources: Vec<_> = bundle.into_resources().collect();
        assert_eq!(resources[0]["id"], "1");
    }
}
