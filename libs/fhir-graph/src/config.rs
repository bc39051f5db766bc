//! Graph synthesis configuration
//!
//! Dataset conventions (which types are vertices, which field names mark a
//! primary edge, which edges are curated by hand) are supplied here rather
//! than hard-coded in the synthesizer.
//!
//! ```yaml
//! vertices: [Patient, Observation, Specimen]
//! allowlist: [ResearchStudy]
//! ignored_properties: [contained, Observation.focus]
//! primary_fields: [subject]
//! primary_overrides: [Specimen_parent_Specimen]
//! manual_edges:
//!   - source_type: Observation
//!     source_field: specimen
//!     destination_type: Specimen
//!     primary: true
//! categories:
//!   Patient: Administrative
//! identifier_slots: 8
//! ```

use crate::error::{Error, Result};
use ferrum_models::{is_ignored_property, DEFAULT_IDENTIFIER_SLOTS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Category assigned to vertices not listed in `categories`
pub const DEFAULT_CATEGORY: &str = "Clinical";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Resource types in scope as edge sources and destinations. Empty means
    /// every resource type in the descriptor table.
    pub vertices: Vec<String>,

    /// Types retained as vertices even without any edge
    pub allowlist: Vec<String>,

    /// Field names never projected or linked, either bare (`contained`) or
    /// qualified by type (`Observation.focus`)
    pub ignored_properties: Vec<String>,

    /// Field names that mark an edge primary by convention
    pub primary_fields: Vec<String>,

    /// Edge labels (`<Source>_<field>_<Destination>`) forced primary
    pub primary_overrides: Vec<String>,

    /// Edges added regardless of descriptor targets
    pub manual_edges: Vec<ManualEdge>,

    /// Vertex category by type name
    pub categories: BTreeMap<String, String>,

    /// Flat slots for list identifier fields
    pub identifier_slots: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            allowlist: Vec::new(),
            ignored_properties: Vec::new(),
            primary_fields: vec!["subject".to_string()],
            primary_overrides: Vec::new(),
            manual_edges: Vec::new(),
            categories: BTreeMap::new(),
            identifier_slots: DEFAULT_IDENTIFIER_SLOTS,
        }
    }
}

/// A curated edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEdge {
    pub source_type: String,
    pub source_field: String,
    pub destination_type: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl ManualEdge {
    pub fn label(&self) -> String {
        format!(
            "{}_{}_{}",
            self.source_type, self.source_field, self.destination_type
        )
    }
}

impl GraphConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.identifier_slots == 0 {
            return Err(Error::InvalidConfig(
                "identifier_slots must be at least 1".to_string(),
            ));
        }
        for edge in &self.manual_edges {
            if edge.source_type.is_empty()
                || edge.source_field.is_empty()
                || edge.destination_type.is_empty()
            {
                return Err(Error::InvalidConfig(format!(
                    "incomplete manual edge '{}'",
                    edge.label()
                )));
            }
        }
        Ok(())
    }

    pub fn is_ignored(&self, type_name: &str, field: &str) -> bool {
        is_ignored_property(&self.ignored_properties, type_name, field)
    }

    pub fn category(&self, type_name: &str) -> &str {
        self.categories
            .get(type_name)
            .map(String::as_str)
            .unwrap_or(DEFAULT_CATEGORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.primary_fields, vec!["subject"]);
        assert_eq!(config.identifier_slots, 8);
        assert_eq!(config.category("Patient"), "Clinical");
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = r#"
vertices: [Patient, Observation]
ignored_properties: [contained, Observation.focus]
primary_overrides: [Observation_focus_Patient]
manual_edges:
  - source_type: Observation
    source_field: specimen
    destination_type: Specimen
    primary: true
categories:
  Patient: Administrative
"#;
        let config = GraphConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.vertices, vec!["Patient", "Observation"]);
        assert_eq!(config.primary_fields, vec!["subject"]);
        assert_eq!(config.manual_edges[0].label(), "Observation_specimen_Specimen");
        assert_eq!(config.category("Patient"), "Administrative");

        let back = GraphConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_ignored_properties() {
        let config = GraphConfig {
            ignored_properties: vec!["contained".to_string(), "Observation.focus".to_string()],
            ..GraphConfig::default()
        };
        assert!(config.is_ignored("Patient", "contained"));
        assert!(config.is_ignored("Observation", "focus"));
        assert!(!config.is_ignored("Task", "focus"));
    }

    #[test]
    fn test_zero_identifier_slots_rejected() {
        let err = GraphConfig::from_yaml("identifier_slots: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
