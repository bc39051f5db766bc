//! Structural flattening projector
//!
//! Turns one resource instance into a [`FlatRecord`]. The projector holds
//! only immutable data, so one instance can be shared across worker threads.

use crate::error::{Error, Result};
use crate::record::{FieldMap, FlatRecord, Relation};
use crate::reference::{collect_references, CapturedReference, ReferenceStrategy, RelativeReferences};
use crate::render::{render_field, RenderContext};
use ferrum_models::{
    is_ignored_property, DescriptorTable, FlatType, PermittedFields, ProvisionalField,
    ResourceInstance, Warning, DEFAULT_IDENTIFIER_SLOTS,
};
use heck::ToSnakeCase;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ProjectorConfig {
    /// Identifiers beyond this many share the last slot
    pub identifier_slots: usize,
    /// Fields never projected, as bare names or `Type.field`
    pub ignored_properties: Vec<String>,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            identifier_slots: DEFAULT_IDENTIFIER_SLOTS,
            ignored_properties: Vec::new(),
        }
    }
}

impl ProjectorConfig {
    pub fn is_ignored(&self, type_name: &str, field: &str) -> bool {
        is_ignored_property(&self.ignored_properties, type_name, field)
    }
}

/// Result of projecting one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub record: FlatRecord,
    /// Every typed reference found in the resource, in field order
    pub references: Vec<CapturedReference>,
    /// Produced names outside the permitted set, one entry per name
    pub provisional: Vec<ProvisionalField>,
    pub warnings: Vec<Warning>,
}

pub struct Projector<S = RelativeReferences> {
    table: Arc<DescriptorTable>,
    config: ProjectorConfig,
    strategy: S,
}

impl Projector<RelativeReferences> {
    pub fn new(table: Arc<DescriptorTable>) -> Self {
        Self::with_strategy(table, RelativeReferences)
    }
}

impl<S: ReferenceStrategy> Projector<S> {
    pub fn with_strategy(table: Arc<DescriptorTable>, strategy: S) -> Self {
        Self {
            table,
            config: ProjectorConfig::default(),
            strategy,
        }
    }

    pub fn with_config(mut self, config: ProjectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Project a resource against the permitted fields of its type.
    ///
    /// Fails on the first field that cannot be rendered; no partial record is
    /// returned.
    pub fn project(
        &self,
        instance: &ResourceInstance,
        permitted: &PermittedFields,
    ) -> Result<Projection> {
        let type_name = instance.resource_type();
        let descriptor = self
            .table
            .get(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))?;

        let ctx = RenderContext {
            type_name,
            table: &self.table,
            identifier_slots: self.config.identifier_slots.max(1),
        };

        let mut object = FieldMap::new();
        let mut provisional = Vec::new();
        let mut warnings = Vec::new();
        let mut flagged = HashSet::new();

        for field in &descriptor.fields {
            let Some(value) = instance.get(&field.name) else {
                continue;
            };
            if !permitted.permits(&field.name) || self.config.is_ignored(type_name, &field.name) {
                tracing::trace!(resource_type = type_name, field = %field.name, "field not projected");
                continue;
            }

            for (name, value) in render_field(&ctx, field, value)? {
                if !permitted.permits(&name) && flagged.insert(name.clone()) {
                    provisional.push(ProvisionalField {
                        type_name: type_name.to_string(),
                        name: name.clone(),
                        flat_type: flat_type_of(&value),
                    });
                    warnings.push(Warning::MissingPermittedField {
                        type_name: type_name.to_string(),
                        field: name.clone(),
                    });
                }
                object.insert(name, value);
            }
        }

        let id = self.strategy.render_id(instance.id());
        object.set("id", Value::String(id.clone()));

        let references = collect_references(&self.strategy, descriptor, instance.body());
        let relations = self.relations(&references, permitted);

        tracing::debug!(
            resource_type = type_name,
            id = instance.id(),
            fields = object.len(),
            relations = relations.len(),
            "projected resource"
        );

        Ok(Projection {
            record: FlatRecord {
                id,
                name: type_name.to_string(),
                relations,
                object,
            },
            references,
            provisional,
            warnings,
        })
    }

    /// Parse and project a JSON resource
    pub fn project_value(&self, value: Value, permitted: &PermittedFields) -> Result<Projection> {
        let instance = ResourceInstance::from_value(value)?;
        self.project(&instance, permitted)
    }

    /// Captured references whose destination is linked from this type,
    /// first occurrence per destination id
    fn relations(
        &self,
        references: &[CapturedReference],
        permitted: &PermittedFields,
    ) -> Vec<Relation> {
        let mut seen = HashSet::new();
        references
            .iter()
            .filter(|reference| permitted.links_to(&reference.dest_type.to_snake_case()))
            .filter(|reference| seen.insert(reference.dest_id.as_str()))
            .map(|reference| Relation {
                dst_id: self.strategy.render_id(&reference.dest_id),
                dst_name: reference.dest_type.clone(),
            })
            .collect()
    }
}

fn flat_type_of(value: &Value) -> FlatType {
    match value {
        Value::Number(_) => FlatType::Number,
        Value::Bool(_) => FlatType::Boolean,
        _ => FlatType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_properties() {
        let config = ProjectorConfig {
            ignored_properties: vec!["meta".to_string(), "Patient.photo".to_string()],
            ..ProjectorConfig::default()
        };
        assert!(config.is_ignored("Observation", "meta"));
        assert!(config.is_ignored("Patient", "photo"));
        assert!(!config.is_ignored("Practitioner", "photo"));
    }

    #[test]
    fn test_default_slots_are_shared() {
        assert_eq!(ProjectorConfig::default().identifier_slots, DEFAULT_IDENTIFIER_SLOTS);
    }

    #[test]
    fn test_flat_type_of() {
        assert_eq!(flat_type_of(&serde_json::json!(1.5)), FlatType::Number);
        assert_eq!(flat_type_of(&serde_json::json!(true)), FlatType::Boolean);
        assert_eq!(flat_type_of(&serde_json::json!("x")), FlatType::String);
    }
}
