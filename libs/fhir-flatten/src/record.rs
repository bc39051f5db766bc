//! Flat records
//!
//! One record per resource instance: its id, type, outgoing relations and a
//! flat field map. Serialized as one NDJSON line:
//!
//! ```json
//! {"id":"o1","name":"Observation","relations":[{"dst_id":"p1","dst_name":"Patient"}],"object":{"code":"Glucose"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outgoing relation of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub dst_id: String,
    pub dst_name: String,
}

/// Flat field map in insertion order. Repeated names accumulate into a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(Map<String, Value>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, accumulating into an ordered list on collision
    pub fn insert(&mut self, name: String, value: Value) {
        match self.0.get_mut(&name) {
            None => {
                self.0.insert(name, value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    /// Replace a value outright
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(existing) = self.0.get_mut(name) {
            *existing = value;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub id: String,
    /// Resource type name
    pub name: String,
    pub relations: Vec<Relation>,
    pub object: FieldMap,
}

impl FlatRecord {
    /// Render as a single NDJSON line (without the trailing newline)
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collisions_accumulate_in_order() {
        let mut fields = FieldMap::new();
        fields.insert("identifier_7".to_string(), json!("a#1"));
        fields.insert("identifier_7".to_string(), json!("b#2"));
        fields.insert("identifier_7".to_string(), json!("c#3"));
        assert_eq!(fields.get("identifier_7"), Some(&json!(["a#1", "b#2", "c#3"])));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_record_serialization() {
        let mut object = FieldMap::new();
        object.insert("status".to_string(), json!("final"));
        object.insert("code".to_string(), json!("Glucose"));
        let record = FlatRecord {
            id: "o1".to_string(),
            name: "Observation".to_string(),
            relations: vec![Relation {
                dst_id: "p1".to_string(),
                dst_name: "Patient".to_string(),
            }],
            object,
        };
        assert_eq!(
            record.to_ndjson().unwrap(),
            r#"{"id":"o1","name":"Observation","relations":[{"dst_id":"p1","dst_name":"Patient"}],"object":{"status":"final","code":"Glucose"}}"#
        );
    }
}
