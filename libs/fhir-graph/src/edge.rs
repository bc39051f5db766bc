//! Edge descriptors

use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMultiplicity {
    /// Single-valued source field
    ManyToOne,
    /// List source field
    ManyToMany,
}

impl EdgeMultiplicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManyToOne => "many_to_one",
            Self::ManyToMany => "many_to_many",
        }
    }
}

impl fmt::Display for EdgeMultiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge from a reference field to one of its destination types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDescriptor {
    pub source_type: String,
    /// Field carrying the reference; `<field>_<inner>` for references held
    /// inside a backbone element
    pub source_field: String,
    pub destination_type: String,
    /// Name under which the destination exposes this edge
    pub backref: String,
    pub multiplicity: EdgeMultiplicity,
    pub is_primary: bool,
    /// Whether the field must be present on the source
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl EdgeDescriptor {
    pub fn new(
        source_type: impl Into<String>,
        source_field: impl Into<String>,
        destination_type: impl Into<String>,
        multiplicity: EdgeMultiplicity,
    ) -> Self {
        Self {
            source_type: source_type.into(),
            source_field: source_field.into(),
            destination_type: destination_type.into(),
            backref: String::new(),
            multiplicity,
            is_primary: false,
            required: false,
            docstring: None,
        }
    }

    /// `<source>_<field>_<destination>`
    pub fn label(&self) -> String {
        format!(
            "{}_{}_{}",
            self.source_type, self.source_field, self.destination_type
        )
    }

    pub(crate) fn key(&self) -> (&str, &str, &str) {
        (&self.source_type, &self.source_field, &self.destination_type)
    }
}

/// Lower snake-case form of a type name, used for vertex ids and backrefs
/// (`DiagnosticReport` -> `diagnostic_report`)
pub fn underscored(type_name: &str) -> String {
    type_name.to_snake_case()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let edge = EdgeDescriptor::new(
            "Observation",
            "subject",
            "Patient",
            EdgeMultiplicity::ManyToOne,
        );
        assert_eq!(edge.label(), "Observation_subject_Patient");
        assert!(!edge.is_primary);
    }

    #[test]
    fn test_underscored() {
        assert_eq!(underscored("DiagnosticReport"), "diagnostic_report");
        assert_eq!(underscored("Patient"), "patient");
    }
}
