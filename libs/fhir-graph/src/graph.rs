//! Reference graph
//!
//! Edges grouped by (source type, destination type) plus the set of types
//! retained as vertices.

use crate::edge::EdgeDescriptor;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Header row of a Cytoscape SIF table
pub const SIF_HEADER: &str = "sourceName\t(edgeType)\ttargetName";

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceGraph {
    /// Ordered by source type, source field, destination type
    edges: Vec<EdgeDescriptor>,
    vertices: BTreeSet<String>,
    #[serde(skip)]
    pairs: BTreeMap<(String, String), Vec<usize>>,
}

impl ReferenceGraph {
    pub(crate) fn new(mut edges: Vec<EdgeDescriptor>, vertices: BTreeSet<String>) -> Self {
        edges.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut pairs: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (i, edge) in edges.iter().enumerate() {
            pairs
                .entry((edge.source_type.clone(), edge.destination_type.clone()))
                .or_default()
                .push(i);
        }

        Self {
            edges,
            vertices,
            pairs,
        }
    }

    pub fn edges(&self) -> &[EdgeDescriptor] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.vertices.iter().map(String::as_str)
    }

    pub fn contains_vertex(&self, type_name: &str) -> bool {
        self.vertices.contains(type_name)
    }

    /// All edges of one type pair
    pub fn edges_between<'a>(
        &'a self,
        source: &str,
        destination: &str,
    ) -> impl Iterator<Item = &'a EdgeDescriptor> + 'a {
        self.pairs
            .get(&(source.to_string(), destination.to_string()))
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
    }

    pub fn primary_edge(&self, source: &str, destination: &str) -> Option<&EdgeDescriptor> {
        self.edges_between(source, destination)
            .find(|edge| edge.is_primary)
    }

    pub fn outgoing<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a EdgeDescriptor> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source_type == source)
    }

    pub fn incoming<'a>(
        &'a self,
        destination: &'a str,
    ) -> impl Iterator<Item = &'a EdgeDescriptor> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.destination_type == destination)
    }

    pub fn primary_edges(&self) -> impl Iterator<Item = &EdgeDescriptor> {
        self.edges.iter().filter(|edge| edge.is_primary)
    }

    /// Type pairs with their edge counts
    pub fn pair_counts(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.pairs
            .iter()
            .map(|((source, destination), edges)| (source.as_str(), destination.as_str(), edges.len()))
    }

    /// Render the edges as a tab-separated SIF table for Cytoscape
    pub fn to_sif(&self, primary_only: bool) -> String {
        let mut out = String::from(SIF_HEADER);
        out.push('\n');
        for edge in &self.edges {
            if primary_only && !edge.is_primary {
                continue;
            }
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "{}\t{}\t{}",
                edge.source_type, edge.source_field, edge.destination_type
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeMultiplicity;

    fn graph() -> ReferenceGraph {
        let mut subject = EdgeDescriptor::new(
            "Observation",
            "subject",
            "Patient",
            EdgeMultiplicity::ManyToOne,
        );
        subject.is_primary = true;
        let performer = EdgeDescriptor::new(
            "Observation",
            "performer",
            "Patient",
            EdgeMultiplicity::ManyToMany,
        );
        let vertices = ["Observation", "Patient"].map(String::from).into();
        ReferenceGraph::new(vec![subject, performer], vertices)
    }

    #[test]
    fn test_pair_index() {
        let graph = graph();
        assert_eq!(graph.edges_between("Observation", "Patient").count(), 2);
        assert_eq!(graph.edges_between("Patient", "Observation").count(), 0);
        assert_eq!(
            graph.primary_edge("Observation", "Patient").unwrap().source_field,
            "subject"
        );
        assert_eq!(
            graph.pair_counts().collect::<Vec<_>>(),
            vec![("Observation", "Patient", 2)]
        );
    }

    #[test]
    fn test_sif() {
        let graph = graph();
        assert_eq!(
            graph.to_sif(false),
            "sourceName\t(edgeType)\ttargetName\n\
             Observation\tperformer\tPatient\n\
             Observation\tsubject\tPatient\n"
        );
        assert_eq!(
            graph.to_sif(true),
            "sourceName\t(edgeType)\ttargetName\nObservation\tsubject\tPatient\n"
        );
    }
}
