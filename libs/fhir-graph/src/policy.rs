//! Primary edge selection
//!
//! Storage backends model a single edge per (source, destination) pair, so one
//! edge of each pair is designated primary. How that edge is chosen is a
//! dataset convention and is pluggable through [`PrimaryEdgePolicy`].

use crate::config::GraphConfig;
use crate::edge::EdgeDescriptor;
use std::collections::BTreeSet;

/// Outcome of primary selection for one type pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimarySelection {
    /// Index of the primary edge within the pair
    Primary(usize),
    /// No single edge qualifies; holds the tied candidates, if any
    Ambiguous(Vec<usize>),
}

pub trait PrimaryEdgePolicy: Send + Sync {
    /// Choose the primary edge among all edges sharing one
    /// (source, destination) pair. `edges` is never empty.
    fn select(&self, edges: &[&EdgeDescriptor]) -> PrimarySelection;
}

/// Default policy: a sole edge is primary; otherwise an overridden label wins,
/// then a conventional field name (e.g. `subject`).
#[derive(Debug, Clone, Default)]
pub struct ConventionPolicy {
    primary_fields: BTreeSet<String>,
    overrides: BTreeSet<String>,
}

impl ConventionPolicy {
    pub fn new<F, O>(primary_fields: F, overrides: O) -> Self
    where
        F: IntoIterator<Item = String>,
        O: IntoIterator<Item = String>,
    {
        Self {
            primary_fields: primary_fields.into_iter().collect(),
            overrides: overrides.into_iter().collect(),
        }
    }

    /// Policy from configuration; curated edges flagged primary count as
    /// overrides
    pub fn from_config(config: &GraphConfig) -> Self {
        let overrides = config.primary_overrides.iter().cloned().chain(
            config
                .manual_edges
                .iter()
                .filter(|edge| edge.primary)
                .map(|edge| edge.label()),
        );
        Self::new(config.primary_fields.iter().cloned(), overrides)
    }
}

impl PrimaryEdgePolicy for ConventionPolicy {
    fn select(&self, edges: &[&EdgeDescriptor]) -> PrimarySelection {
        if edges.len() == 1 {
            return PrimarySelection::Primary(0);
        }

        let overridden = matching(edges, |edge| self.overrides.contains(&edge.label()));
        if !overridden.is_empty() {
            return single_or_tie(overridden);
        }

        let conventional = matching(edges, |edge| self.primary_fields.contains(&edge.source_field));
        single_or_tie(conventional)
    }
}

fn matching(edges: &[&EdgeDescriptor], pred: impl Fn(&EdgeDescriptor) -> bool) -> Vec<usize> {
    edges
        .iter()
        .enumerate()
        .filter(|(_, edge)| pred(edge))
        .map(|(i, _)| i)
        .collect()
}

fn single_or_tie(candidates: Vec<usize>) -> PrimarySelection {
    match candidates.as_slice() {
        [only] => PrimarySelection::Primary(*only),
        _ => PrimarySelection::Ambiguous(candidates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeMultiplicity;

    fn edge(field: &str) -> EdgeDescriptor {
        EdgeDescriptor::new("Observation", field, "Patient", EdgeMultiplicity::ManyToOne)
    }

    #[test]
    fn test_sole_edge_is_primary() {
        let policy = ConventionPolicy::default();
        let performer = edge("performer");
        assert_eq!(policy.select(&[&performer]), PrimarySelection::Primary(0));
    }

    #[test]
    fn test_convention_field_wins() {
        let policy = ConventionPolicy::new(["subject".to_string()], Vec::new());
        let (performer, subject) = (edge("performer"), edge("subject"));
        assert_eq!(
            policy.select(&[&performer, &subject]),
            PrimarySelection::Primary(1)
        );
    }

    #[test]
    fn test_override_beats_convention() {
        let policy = ConventionPolicy::new(
            ["subject".to_string()],
            ["Observation_performer_Patient".to_string()],
        );
        let (performer, subject) = (edge("performer"), edge("subject"));
        assert_eq!(
            policy.select(&[&performer, &subject]),
            PrimarySelection::Primary(0)
        );
    }

    #[test]
    fn test_no_candidate_is_ambiguous() {
        let policy = ConventionPolicy::default();
        let (performer, focus) = (edge("performer"), edge("focus"));
        assert_eq!(
            policy.select(&[&performer, &focus]),
            PrimarySelection::Ambiguous(vec![])
        );
    }
}
