//! Permitted flat-field sets
//!
//! The schema assembler derives, per resource type, which flat field names a
//! projected record may carry and which destination types its relations may
//! point at. The projector only reads this set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifier slots per list identifier field
pub const DEFAULT_IDENTIFIER_SLOTS: usize = 8;

/// Whether a field matches an ignore list of bare names or `Type.field`
/// entries
pub fn is_ignored_property(ignored: &[String], type_name: &str, field: &str) -> bool {
    ignored.iter().any(|entry| match entry.split_once('.') {
        Some((owner, name)) => owner == type_name && name == field,
        None => entry == field,
    })
}

/// Storage type of a flat field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlatType {
    String,
    Number,
    Boolean,
}

/// A projected name outside the permitted set, kept until a schema owner
/// accepts or rejects it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProvisionalField {
    pub type_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub flat_type: FlatType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermittedFields {
    type_name: String,
    fields: BTreeSet<String>,
    /// Destination types (underscored) of this type's outgoing links
    link_targets: BTreeSet<String>,
}

impl PermittedFields {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_link_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.link_targets
            .extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn insert(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into());
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn permits(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn links_to(&self, underscored_type: &str) -> bool {
        self.link_targets.contains(underscored_type)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn link_targets(&self) -> impl Iterator<Item = &str> {
        self.link_targets.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits() {
        let permitted = PermittedFields::new("Observation")
            .with_fields(["code", "code_coding"])
            .with_link_targets(["patient"]);
        assert!(permitted.permits("code_coding"));
        assert!(!permitted.permits("code_text"));
        assert!(permitted.links_to("patient"));
        assert_eq!(permitted.type_name(), "Observation");
    }

    #[test]
    fn test_ignored_property_entries() {
        let ignored = vec!["meta".to_string(), "Observation.focus".to_string()];
        assert!(is_ignored_property(&ignored, "Patient", "meta"));
        assert!(is_ignored_property(&ignored, "Observation", "focus"));
        assert!(!is_ignored_property(&ignored, "Task", "focus"));
        assert!(!is_ignored_property(&ignored, "Observation", "Observation.focus"));
    }
}
