//! Graph schema assembly
//!
//! Turns the retained vertices of a [`ReferenceGraph`] into per-vertex schemas
//! with flat properties and link declarations. The flat property set of a
//! vertex is exactly what the projector is permitted to emit for that type.

use crate::config::GraphConfig;
use crate::edge::{underscored, EdgeDescriptor, EdgeMultiplicity};
use crate::error::{Error, Result};
use crate::graph::ReferenceGraph;
use ferrum_models::{
    DescriptorTable, FieldDescriptor, FlatType, PermittedFields, ProvisionalField, ScalarKind,
    ValueKind,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const PROVISIONAL_DESCRIPTION: &str = "From FHIR extension.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub flat_type: FlatType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertySchema {
    fn new(flat_type: FlatType, description: Option<&str>) -> Self {
        Self {
            flat_type,
            description: description.map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSchema {
    /// Link name, unique within the vertex
    pub name: String,
    pub backref: String,
    pub label: String,
    /// Underscored destination type
    pub target_type: String,
    pub multiplicity: EdgeMultiplicity,
    pub required: bool,
}

impl LinkSchema {
    fn from_edge(edge: &EdgeDescriptor) -> Self {
        // Backends key links by name; only subject links to Patient keep the
        // bare name
        let name = if edge.source_field == "subject" && edge.destination_type != "Patient" {
            format!("subject_{}", edge.destination_type)
        } else {
            edge.source_field.clone()
        };
        Self {
            name,
            backref: edge.backref.clone(),
            label: edge.label(),
            target_type: underscored(&edge.destination_type),
            multiplicity: edge.multiplicity,
            required: edge.required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexSchema {
    pub title: String,
    /// Underscored type name
    pub id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub properties: BTreeMap<String, PropertySchema>,
    pub links: Vec<LinkSchema>,
}

impl VertexSchema {
    pub fn permitted(&self) -> PermittedFields {
        PermittedFields::new(&self.title)
            .with_fields(self.properties.keys().cloned())
            .with_link_targets(self.links.iter().map(|link| link.target_type.clone()))
    }
}

/// Schemas of all retained vertices, keyed by type name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    pub vertices: BTreeMap<String, VertexSchema>,
}

impl GraphSchema {
    pub fn assemble(table: &DescriptorTable, graph: &ReferenceGraph, config: &GraphConfig) -> Self {
        let vertices = graph
            .vertices()
            .map(|type_name| {
                let vertex = assemble_vertex(type_name, table, graph, config);
                (type_name.to_string(), vertex)
            })
            .collect();
        Self { vertices }
    }

    pub fn vertex(&self, type_name: &str) -> Option<&VertexSchema> {
        self.vertices.get(type_name)
    }

    /// Permitted flat fields of a vertex type
    pub fn permitted(&self, type_name: &str) -> Option<PermittedFields> {
        self.vertex(type_name).map(VertexSchema::permitted)
    }

    /// Add accepted provisional fields to their vertices. Returns the number
    /// of properties added.
    pub fn accept_provisional<'a, I>(&mut self, fields: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a ProvisionalField>,
    {
        let mut added = 0;
        for field in fields {
            let vertex = self
                .vertices
                .get_mut(&field.type_name)
                .ok_or_else(|| Error::UnknownType(field.type_name.clone()))?;
            if vertex.properties.contains_key(&field.name) {
                continue;
            }
            tracing::info!(type_name = %field.type_name, field = %field.name, "accepted provisional field");
            vertex.properties.insert(
                field.name.clone(),
                PropertySchema::new(field.flat_type, Some(PROVISIONAL_DESCRIPTION)),
            );
            added += 1;
        }
        Ok(added)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

fn assemble_vertex(
    type_name: &str,
    table: &DescriptorTable,
    graph: &ReferenceGraph,
    config: &GraphConfig,
) -> VertexSchema {
    let descriptor = table.get(type_name);

    let mut properties = BTreeMap::new();
    for field in descriptor.into_iter().flat_map(|d| d.fields.iter()) {
        if config.is_ignored(type_name, &field.name) {
            continue;
        }
        if !field.kind.is_supported() {
            tracing::debug!(type_name, field = %field.name, kind = %field.kind, "no flat property for unsupported kind");
            continue;
        }
        add_field_properties(&mut properties, table, field, config.identifier_slots);
    }

    let links = graph
        .outgoing(type_name)
        .filter(|edge| edge.is_primary)
        .map(LinkSchema::from_edge)
        .collect();

    VertexSchema {
        title: type_name.to_string(),
        id: underscored(type_name),
        category: config.category(type_name).to_string(),
        description: descriptor.and_then(|d| d.docstring.clone()),
        properties,
        links,
    }
}

/// Properties a field projects to: the bare name, plus one slot per list
/// position for kinds named by position
fn add_field_properties(
    properties: &mut BTreeMap<String, PropertySchema>,
    table: &DescriptorTable,
    field: &FieldDescriptor,
    slots: usize,
) {
    add_named_properties(properties, table, &field.name, field, slots);
}

fn add_named_properties(
    properties: &mut BTreeMap<String, PropertySchema>,
    table: &DescriptorTable,
    name: &str,
    field: &FieldDescriptor,
    slots: usize,
) {
    let doc = field.docstring.as_deref();

    if field.kind.names_from_content() {
        properties.insert(name.to_string(), PropertySchema::new(FlatType::String, doc));
        return;
    }

    add_kind_properties(properties, table, name, &field.kind, doc, slots);
    if field.is_list() {
        for i in 1..slots {
            let name = format!("{}_{}", name, i);
            add_kind_properties(properties, table, &name, &field.kind, doc, slots);
        }
    }
}

fn add_kind_properties(
    properties: &mut BTreeMap<String, PropertySchema>,
    table: &DescriptorTable,
    name: &str,
    kind: &ValueKind,
    doc: Option<&str>,
    slots: usize,
) {
    if *kind == ValueKind::SpecimenProcessing {
        // the step itself gates projection; its members carry the values
        properties.insert(name.to_string(), PropertySchema::new(FlatType::String, doc));
        for member in table.get(kind.name()).into_iter().flat_map(|d| d.fields.iter()) {
            if member.kind.is_supported() {
                let member_name = format!("{}_{}", name, member.name);
                add_named_properties(properties, table, &member_name, member, slots);
            }
        }
        return;
    }

    let mut add = |name: String, flat_type: FlatType, description: Option<&str>| {
        properties.insert(name, PropertySchema::new(flat_type, description));
    };

    match kind {
        ValueKind::Scalar(ScalarKind::Number) | ValueKind::Decimal | ValueKind::Age => {
            add(name.to_string(), FlatType::Number, doc)
        }
        ValueKind::Scalar(ScalarKind::Bool) => add(name.to_string(), FlatType::Boolean, doc),
        ValueKind::CodeableConcept | ValueKind::Coding | ValueKind::FamilyMemberHistoryCondition => {
            add(name.to_string(), FlatType::String, doc);
            add(format!("{}_coding", name), FlatType::String, Some("Coded representation."));
        }
        ValueKind::Quantity => {
            add(name.to_string(), FlatType::String, doc);
            add(format!("{}_unit", name), FlatType::String, Some("Unit representation."));
            add(
                format!("{}_value", name),
                FlatType::Number,
                Some("Numerical value (with implicit precision)"),
            );
        }
        ValueKind::DocumentReferenceContent => {
            add(name.to_string(), FlatType::String, doc);
            add(format!("{}_url", name), FlatType::String, Some("Attachment location."));
        }
        ValueKind::Scalar(ScalarKind::String | ScalarKind::Date | ScalarKind::DateTime)
        | ValueKind::Identifier
        | ValueKind::HumanName
        | ValueKind::Address
        | ValueKind::ContactPoint
        | ValueKind::Reference
        | ValueKind::CodeableReference
        | ValueKind::SampledData
        | ValueKind::PatientCommunication
        | ValueKind::Extension
        | ValueKind::ObservationComponent
        | ValueKind::TaskInput
        | ValueKind::TaskOutput => add(name.to_string(), FlatType::String, doc),
        ValueKind::SpecimenProcessing | ValueKind::Unsupported(_) => {}
    }
}
