//! Resource type descriptors
//!
//! Language-agnostic description of every resource type in scope: its ordered
//! fields, each field's value kind, multiplicity, optionality and reference
//! targets. A [`DescriptorTable`] is built once per session and never mutated
//! afterwards.

use crate::error::{Error, Result};
use crate::value_kind::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Untyped reference target, meaning "any resource"
pub const ANY_RESOURCE: &str = "Resource";

/// Whether a field holds one value or a list of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    #[default]
    Single,
    List,
}

impl Multiplicity {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List)
    }
}

/// A field within a resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears in JSON (e.g., "subject", "valueQuantity")
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    #[serde(default)]
    pub required: bool,
    /// Target resource types, for reference kinds
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multiplicity: Multiplicity::Single,
            required: false,
            target_types: Vec::new(),
            docstring: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.multiplicity = Multiplicity::List;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_types = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn doc(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn is_list(&self) -> bool {
        self.multiplicity.is_list()
    }
}

/// A resource (or backbone element) type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypeDescriptor {
    /// Type name (e.g., "Patient", "ObservationComponent")
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl ResourceTypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docstring: None,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn doc(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields carrying resource references
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.kind.is_reference())
    }
}

/// Registry of all type descriptors in scope, ordered by type name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorTable {
    types: BTreeMap<String, ResourceTypeDescriptor>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type to the table, replacing any previous type of the same name
    pub fn add_type(&mut self, descriptor: ResourceTypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    pub fn with_type(mut self, descriptor: ResourceTypeDescriptor) -> Self {
        self.add_type(descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ResourceTypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterate over all types in name order
    pub fn types(&self) -> impl Iterator<Item = &ResourceTypeDescriptor> {
        self.types.values()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Load a precomputed table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.check()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn check(&self) -> Result<()> {
        for (key, descriptor) in &self.types {
            if key != &descriptor.name {
                return Err(Error::InvalidDescriptor(format!(
                    "table key '{}' does not match type name '{}'",
                    key, descriptor.name
                )));
            }
            for field in &descriptor.fields {
                if field.name.is_empty() {
                    return Err(Error::InvalidDescriptor(format!(
                        "{} has a field without a name",
                        descriptor.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<ResourceTypeDescriptor> for DescriptorTable {
    fn from_iter<T: IntoIterator<Item = ResourceTypeDescriptor>>(iter: T) -> Self {
        let mut table = Self::new();
        for descriptor in iter {
            table.add_type(descriptor);
        }
        table
    }
}
