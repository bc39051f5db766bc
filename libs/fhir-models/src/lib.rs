//! FHIR graph models
//!
//! Shared data model for reference-graph synthesis and structural flattening.
//!
//! # Module Organization
//!
//! - `value_kind`: closed set of value shapes ([`ValueKind`])
//! - `descriptor`: per-type field descriptors and the [`DescriptorTable`]
//! - `loader`: builds descriptors from StructureDefinition snapshots
//! - `instance`: runtime resource values ([`ResourceInstance`])
//! - `permitted`: per-type permitted flat-field sets
//! - `diagnostics`: deduplicated non-fatal warnings
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::{DescriptorTable, FieldDescriptor, ResourceTypeDescriptor, ValueKind};
//!
//! let table: DescriptorTable = [ResourceTypeDescriptor::new("Observation")
//!     .with_field(FieldDescriptor::new("code", ValueKind::CodeableConcept))
//!     .with_field(FieldDescriptor::new("subject", ValueKind::Reference).targets(["Patient"]))]
//! .into_iter()
//! .collect();
//!
//! let observation = table.get("Observation").unwrap();
//! assert_eq!(observation.reference_fields().count(), 1);
//! ```

pub mod bundle;
pub mod descriptor;
pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod loader;
pub mod permitted;
pub mod value_kind;

// Re-export commonly used types
pub use bundle::{Bundle, BundleEntry};
pub use descriptor::{
    DescriptorTable, FieldDescriptor, Multiplicity, ResourceTypeDescriptor, ANY_RESOURCE,
};
pub use diagnostics::{Diagnostics, Warning};
pub use error::{Error, Result};
pub use instance::ResourceInstance;
pub use permitted::{
    is_ignored_property, FlatType, PermittedFields, ProvisionalField, DEFAULT_IDENTIFIER_SLOTS,
};
pub use value_kind::{ScalarKind, ValueKind};
