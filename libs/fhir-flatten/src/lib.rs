//! Structural flattening of FHIR resources
//!
//! Projects a nested resource into a flat record of scalar fields plus its
//! outgoing relations, following the resource's type descriptor and the
//! field names the graph schema permits for its type.
//!
//! # Example
//!
//! ```rust
//! use ferrum_flatten::Projector;
//! use ferrum_models::{DescriptorTable, FieldDescriptor, PermittedFields, ResourceTypeDescriptor, ValueKind};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let table: DescriptorTable = [ResourceTypeDescriptor::new("Observation")
//!     .with_field(FieldDescriptor::new("code", ValueKind::CodeableConcept))
//!     .with_field(FieldDescriptor::new("subject", ValueKind::Reference).targets(["Patient"]))]
//! .into_iter()
//! .collect();
//! let permitted = PermittedFields::new("Observation")
//!     .with_fields(["code", "code_coding", "subject"])
//!     .with_link_targets(["patient"]);
//!
//! let projector = Projector::new(Arc::new(table));
//! let projection = projector
//!     .project_value(
//!         json!({
//!             "resourceType": "Observation",
//!             "id": "o1",
//!             "code": {"text": "Glucose", "coding": [{"system": "http://loinc.org", "code": "2345-7"}]},
//!             "subject": {"reference": "Patient/p1"}
//!         }),
//!         &permitted,
//!     )
//!     .unwrap();
//!
//! assert_eq!(projection.record.object.get("code"), Some(&json!("Glucose")));
//! assert_eq!(projection.record.relations[0].dst_id, "p1");
//! ```

pub mod error;
pub mod projector;
pub mod record;
pub mod reference;
mod render;

pub use error::{Error, Result};
pub use ferrum_models::DEFAULT_IDENTIFIER_SLOTS;
pub use projector::{Projection, Projector, ProjectorConfig};
pub use record::{FieldMap, FlatRecord, Relation};
pub use reference::{
    parse_reference, CapturedReference, ReferenceKind, ReferenceStrategy, ReferenceTarget,
    RelativeReferences, StudyScopedIds, STUDY_NAMESPACE,
};
