//! FHIR reference graph
//!
//! Infers a property-graph schema from resource type descriptors: one edge per
//! reference field and destination type, a backref name for each edge, and a
//! single primary edge per (source, destination) pair.
//!
//! # Example
//!
//! ```rust
//! use ferrum_graph::{synthesize, GraphConfig, GraphSchema};
//! use ferrum_models::{DescriptorTable, FieldDescriptor, ResourceTypeDescriptor, ValueKind};
//!
//! let table: DescriptorTable = [
//!     ResourceTypeDescriptor::new("Patient"),
//!     ResourceTypeDescriptor::new("Observation")
//!         .with_field(FieldDescriptor::new("code", ValueKind::CodeableConcept))
//!         .with_field(FieldDescriptor::new("subject", ValueKind::Reference).targets(["Patient"])),
//! ]
//! .into_iter()
//! .collect();
//!
//! let config = GraphConfig::default();
//! let outcome = synthesize(&table, &config).unwrap();
//! outcome.ensure_publishable().unwrap();
//!
//! let schema = GraphSchema::assemble(&table, &outcome.graph, &config);
//! let permitted = schema.permitted("Observation").unwrap();
//! assert!(permitted.permits("code_coding"));
//! assert!(permitted.links_to("patient"));
//! ```

pub mod config;
pub mod edge;
pub mod error;
pub mod graph;
pub mod policy;
pub mod schema;
pub mod synthesizer;

pub use config::{GraphConfig, ManualEdge};
pub use edge::{underscored, EdgeDescriptor, EdgeMultiplicity};
pub use error::{Error, Result};
pub use graph::ReferenceGraph;
pub use policy::{ConventionPolicy, PrimaryEdgePolicy, PrimarySelection};
pub use schema::{GraphSchema, LinkSchema, PropertySchema, VertexSchema};
pub use synthesizer::{synthesize, AmbiguousPrimaryEdge, SynthesisOutcome, Synthesizer};
