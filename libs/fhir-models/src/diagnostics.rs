//! Non-fatal conditions raised while synthesizing graphs or projecting records
//!
//! Large corpora repeat the same condition millions of times, so warnings are
//! accumulated and each distinct warning is logged once.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum Warning {
    /// Reference field whose targets are empty or all out of scope; the field
    /// is dropped from the graph
    OutOfScopeReference {
        source_type: String,
        field: String,
        targets: Vec<String>,
    },
    /// Projected name absent from the permitted set; the value is kept under a
    /// provisional entry
    MissingPermittedField { type_name: String, field: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfScopeReference {
                source_type,
                field,
                targets,
            } if targets.is_empty() => {
                write!(f, "{}.{} has no reference targets", source_type, field)
            }
            Self::OutOfScopeReference {
                source_type,
                field,
                targets,
            } => write!(
                f,
                "{}.{} references out of scope: {}",
                source_type,
                field,
                targets.join(", ")
            ),
            Self::MissingPermittedField { type_name, field } => {
                write!(f, "added {}.{} - not in schema", type_name, field)
            }
        }
    }
}

/// Deduplicating warning accumulator
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    seen: HashSet<Warning>,
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning. Returns `true` the first time a warning is seen.
    pub fn push(&mut self, warning: Warning) -> bool {
        if self.seen.contains(&warning) {
            return false;
        }
        tracing::warn!(%warning, "schema warning");
        self.seen.insert(warning.clone());
        self.warnings.push(warning);
        true
    }

    pub fn extend<I: IntoIterator<Item = Warning>>(&mut self, warnings: I) {
        for warning in warnings {
            self.push(warning);
        }
    }

    /// Distinct warnings in first-seen order
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}
