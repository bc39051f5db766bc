//! Reference graph synthesis
//!
//! Derives the property-graph edges of a resource corpus from the reference
//! fields of its type descriptors. Synthesis runs once over the complete type
//! set, before any record is projected:
//!
//! 1. collect one edge per reference field and in-scope target type
//!    (references held in backbone elements surface as `<field>_<inner>`),
//!    then append curated edges;
//! 2. name backrefs, qualifying them with the source field when a source type
//!    reaches the same destination through several fields;
//! 3. choose one primary edge per type pair through the [`PrimaryEdgePolicy`],
//!    reporting pairs where no single edge qualifies;
//! 4. retain the types that take part in an edge, plus the allowlist.

use crate::config::{GraphConfig, ManualEdge};
use crate::edge::{underscored, EdgeDescriptor, EdgeMultiplicity};
use crate::error::{Error, Result};
use crate::graph::ReferenceGraph;
use crate::policy::{ConventionPolicy, PrimaryEdgePolicy, PrimarySelection};
use ferrum_models::loader::backbone_type_name;
use ferrum_models::{
    DescriptorTable, Diagnostics, FieldDescriptor, ResourceTypeDescriptor, ValueKind, Warning,
    ANY_RESOURCE,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A type pair with several edges and no single primary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousPrimaryEdge {
    pub source_type: String,
    pub destination_type: String,
    /// Labels of every edge of the pair
    pub edges: Vec<String>,
    /// Labels of candidates that tied; empty when none qualified
    pub tied: Vec<String>,
}

impl fmt::Display for AmbiguousPrimaryEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [{}]",
            self.source_type,
            self.destination_type,
            self.edges.join(", ")
        )
    }
}

/// Result of a synthesis run
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub graph: ReferenceGraph,
    pub ambiguous: Vec<AmbiguousPrimaryEdge>,
    pub warnings: Vec<Warning>,
}

impl SynthesisOutcome {
    pub fn is_publishable(&self) -> bool {
        self.ambiguous.is_empty()
    }

    /// Fail if any type pair lacks a primary edge
    pub fn ensure_publishable(&self) -> Result<()> {
        if self.ambiguous.is_empty() {
            Ok(())
        } else {
            Err(Error::AmbiguousPrimaryEdges(self.ambiguous.clone()))
        }
    }
}

pub struct Synthesizer<P = ConventionPolicy> {
    config: GraphConfig,
    policy: P,
}

impl Synthesizer<ConventionPolicy> {
    pub fn new(config: GraphConfig) -> Self {
        let policy = ConventionPolicy::from_config(&config);
        Self { config, policy }
    }
}

impl<P: PrimaryEdgePolicy> Synthesizer<P> {
    pub fn with_policy(config: GraphConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn synthesize(&self, table: &DescriptorTable) -> Result<SynthesisOutcome> {
        self.config.validate()?;
        let scope = self.scope(table)?;
        let mut diagnostics = Diagnostics::new();

        let mut edges = self.collect(table, &scope, &mut diagnostics);
        self.add_manual_edges(table, &mut edges)?;
        edges.sort_by(|a, b| a.key().cmp(&b.key()));

        assign_backrefs(&mut edges);
        let ambiguous = self.resolve_primary(&mut edges);
        let vertices = self.retained_vertices(table, &scope, &edges)?;

        tracing::info!(
            edges = edges.len(),
            vertices = vertices.len(),
            ambiguous = ambiguous.len(),
            warnings = diagnostics.len(),
            "synthesized reference graph"
        );

        Ok(SynthesisOutcome {
            graph: ReferenceGraph::new(edges, vertices),
            ambiguous,
            warnings: diagnostics.into_warnings(),
        })
    }

    /// Types eligible as edge sources and destinations
    fn scope(&self, table: &DescriptorTable) -> Result<BTreeSet<String>> {
        if self.config.vertices.is_empty() {
            let backbones = backbone_types(table);
            return Ok(table
                .type_names()
                .filter(|name| !backbones.contains(*name))
                .map(String::from)
                .collect());
        }

        for vertex in &self.config.vertices {
            if vertex != ANY_RESOURCE && !table.contains(vertex) {
                return Err(Error::UnknownType(vertex.clone()));
            }
        }
        Ok(self.config.vertices.iter().cloned().collect())
    }

    fn collect(
        &self,
        table: &DescriptorTable,
        scope: &BTreeSet<String>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<EdgeDescriptor> {
        let mut edges = Vec::new();

        for source in scope.iter().filter_map(|name| table.get(name)) {
            for field in &source.fields {
                if self.config.is_ignored(&source.name, &field.name) {
                    continue;
                }
                if field.kind.is_reference() {
                    let candidate = Candidate::direct(field);
                    edges.extend(self.edges_for(&source.name, candidate, scope, diagnostics));
                } else if let Some(wrapper) = wrapper_descriptor(table, source, field) {
                    for inner in wrapper.reference_fields() {
                        if self.config.is_ignored(&wrapper.name, &inner.name) {
                            continue;
                        }
                        let candidate = Candidate::wrapped(field, inner);
                        edges.extend(self.edges_for(&source.name, candidate, scope, diagnostics));
                    }
                }
            }
        }

        edges
    }

    fn edges_for(
        &self,
        source_type: &str,
        candidate: Candidate<'_>,
        scope: &BTreeSet<String>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<EdgeDescriptor> {
        let destinations: Vec<&String> = candidate
            .targets
            .iter()
            .filter(|target| scope.contains(*target))
            .collect();

        if destinations.is_empty() {
            diagnostics.push(Warning::OutOfScopeReference {
                source_type: source_type.to_string(),
                field: candidate.name,
                targets: candidate.targets.to_vec(),
            });
            return Vec::new();
        }

        destinations
            .into_iter()
            .map(|destination| {
                let mut edge = EdgeDescriptor::new(
                    source_type,
                    &candidate.name,
                    destination,
                    candidate.multiplicity,
                );
                edge.required = candidate.required;
                edge.docstring = candidate.docstring.map(String::from);
                edge
            })
            .collect()
    }

    fn add_manual_edges(
        &self,
        table: &DescriptorTable,
        edges: &mut Vec<EdgeDescriptor>,
    ) -> Result<()> {
        for manual in &self.config.manual_edges {
            let source = table
                .get(&manual.source_type)
                .ok_or_else(|| Error::UnknownType(manual.source_type.clone()))?;
            if manual.destination_type != ANY_RESOURCE && !table.contains(&manual.destination_type)
            {
                return Err(Error::UnknownType(manual.destination_type.clone()));
            }

            let exists = edges.iter().any(|edge| {
                edge.key()
                    == (
                        manual.source_type.as_str(),
                        manual.source_field.as_str(),
                        manual.destination_type.as_str(),
                    )
            });
            if exists {
                tracing::debug!(edge = %manual.label(), "curated edge already derived");
                continue;
            }

            edges.push(manual_edge(source, manual));
        }
        Ok(())
    }

    fn resolve_primary(&self, edges: &mut [EdgeDescriptor]) -> Vec<AmbiguousPrimaryEdge> {
        let mut pairs: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (i, edge) in edges.iter().enumerate() {
            pairs
                .entry((edge.source_type.clone(), edge.destination_type.clone()))
                .or_default()
                .push(i);
        }

        let mut ambiguous = Vec::new();
        for ((source_type, destination_type), indices) in pairs {
            let selection = {
                let pair: Vec<&EdgeDescriptor> = indices.iter().map(|&i| &edges[i]).collect();
                self.policy.select(&pair)
            };

            match selection {
                PrimarySelection::Primary(k) => {
                    if let Some(&i) = indices.get(k) {
                        edges[i].is_primary = true;
                    }
                }
                PrimarySelection::Ambiguous(_) if destination_type == ANY_RESOURCE => {
                    tracing::debug!(source = %source_type, "no primary edge to untyped references");
                }
                PrimarySelection::Ambiguous(tied) => {
                    let labels = |idx: &[usize]| -> Vec<String> {
                        idx.iter()
                            .filter_map(|&i| edges.get(i))
                            .map(EdgeDescriptor::label)
                            .collect()
                    };
                    let tied: Vec<usize> =
                        tied.iter().filter_map(|&k| indices.get(k).copied()).collect();
                    ambiguous.push(AmbiguousPrimaryEdge {
                        edges: labels(&indices[..]),
                        tied: labels(&tied[..]),
                        source_type,
                        destination_type,
                    });
                }
            }
        }
        ambiguous
    }

    fn retained_vertices(
        &self,
        table: &DescriptorTable,
        scope: &BTreeSet<String>,
        edges: &[EdgeDescriptor],
    ) -> Result<BTreeSet<String>> {
        let mut vertices: BTreeSet<String> = edges
            .iter()
            .flat_map(|edge| [edge.source_type.clone(), edge.destination_type.clone()])
            .collect();

        for allowed in &self.config.allowlist {
            if !table.contains(allowed) {
                return Err(Error::UnknownType(allowed.clone()));
            }
            vertices.insert(allowed.clone());
        }

        for dropped in scope.difference(&vertices) {
            tracing::debug!(type_name = %dropped, "type has no edges; not retained");
        }
        Ok(vertices)
    }
}

/// Synthesize with the default conventions
pub fn synthesize(table: &DescriptorTable, config: &GraphConfig) -> Result<SynthesisOutcome> {
    Synthesizer::new(config.clone()).synthesize(table)
}

/// A reference-carrying field, possibly nested in a backbone element
struct Candidate<'a> {
    name: String,
    targets: &'a [String],
    multiplicity: EdgeMultiplicity,
    required: bool,
    docstring: Option<&'a str>,
}

impl<'a> Candidate<'a> {
    fn direct(field: &'a FieldDescriptor) -> Self {
        Self {
            name: field.name.clone(),
            targets: &field.target_types,
            multiplicity: multiplicity(field.is_list()),
            required: field.required,
            docstring: field.docstring.as_deref(),
        }
    }

    fn wrapped(outer: &'a FieldDescriptor, inner: &'a FieldDescriptor) -> Self {
        Self {
            name: format!("{}_{}", outer.name, inner.name),
            targets: &inner.target_types,
            multiplicity: multiplicity(outer.is_list() || inner.is_list()),
            required: outer.required && inner.required,
            docstring: inner.docstring.as_deref().or(outer.docstring.as_deref()),
        }
    }
}

fn multiplicity(is_list: bool) -> EdgeMultiplicity {
    if is_list {
        EdgeMultiplicity::ManyToMany
    } else {
        EdgeMultiplicity::ManyToOne
    }
}

fn manual_edge(source: &ResourceTypeDescriptor, manual: &ManualEdge) -> EdgeDescriptor {
    let field = source.field(&manual.source_field);
    let mut edge = EdgeDescriptor::new(
        &manual.source_type,
        &manual.source_field,
        &manual.destination_type,
        multiplicity(field.is_some_and(FieldDescriptor::is_list)),
    );
    edge.required = field.is_some_and(|f| f.required);
    edge.docstring = manual
        .docstring
        .clone()
        .or_else(|| field.and_then(|f| f.docstring.clone()));
    edge
}

/// Descriptor of the backbone element a field holds, if any
fn wrapper_descriptor<'t>(
    table: &'t DescriptorTable,
    owner: &ResourceTypeDescriptor,
    field: &FieldDescriptor,
) -> Option<&'t ResourceTypeDescriptor> {
    let name = backbone_type_name(&owner.name, &field.name);
    if field.kind != ValueKind::from_type_code(&name) {
        return None;
    }
    table.get(&name)
}

/// Types that describe backbone elements rather than resources
fn backbone_types(table: &DescriptorTable) -> BTreeSet<String> {
    table
        .types()
        .flat_map(|owner| {
            owner
                .fields
                .iter()
                .filter_map(move |field| wrapper_descriptor(table, owner, field))
        })
        .map(|wrapper| wrapper.name.clone())
        .collect()
}

fn assign_backrefs(edges: &mut [EdgeDescriptor]) {
    // distinct source fields per (destination, source)
    let mut fields: BTreeMap<(String, String), BTreeSet<String>> = BTreeMap::new();
    for edge in edges.iter() {
        fields
            .entry((edge.destination_type.clone(), edge.source_type.clone()))
            .or_default()
            .insert(edge.source_field.clone());
    }

    for edge in edges.iter_mut() {
        let distinct = fields
            .get(&(edge.destination_type.clone(), edge.source_type.clone()))
            .map_or(1, BTreeSet::len);
        edge.backref = if distinct > 1 {
            format!("{}_{}", edge.source_field, underscored(&edge.source_type))
        } else {
            underscored(&edge.source_type)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, field: &str, destination: &str) -> EdgeDescriptor {
        EdgeDescriptor::new(source, field, destination, EdgeMultiplicity::ManyToOne)
    }

    #[test]
    fn test_backrefs_qualified_only_for_multiple_fields() {
        let mut edges = vec![
            edge("Observation", "subject", "Patient"),
            edge("Observation", "performer", "Patient"),
            edge("Condition", "subject", "Patient"),
        ];
        assign_backrefs(&mut edges);
        let backrefs: Vec<_> = edges.iter().map(|e| e.backref.as_str()).collect();
        assert_eq!(
            backrefs,
            vec!["subject_observation", "performer_observation", "condition"]
        );
    }

    #[test]
    fn test_backbone_types() {
        let table: DescriptorTable = [
            ResourceTypeDescriptor::new("Observation").with_field(
                FieldDescriptor::new("component", ValueKind::ObservationComponent).list(),
            ),
            ResourceTypeDescriptor::new("ObservationComponent").with_field(
                FieldDescriptor::new("valueReference", ValueKind::Reference).targets(["Specimen"]),
            ),
            ResourceTypeDescriptor::new("Device").with_field(
                FieldDescriptor::new("definition", ValueKind::CodeableReference)
                    .targets(["DeviceDefinition"]),
            ),
            ResourceTypeDescriptor::new("DeviceDefinition"),
        ]
        .into_iter()
        .collect();

        let backbones = backbone_types(&table);
        assert_eq!(
            backbones.into_iter().collect::<Vec<_>>(),
            vec!["ObservationComponent"]
        );
    }
}
