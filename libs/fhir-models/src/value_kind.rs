//! Value kinds
//!
//! Closed set of value shapes the flattening projector knows how to decompose.
//! Every FHIR type code a field can carry is mapped onto one of these kinds by
//! [`ValueKind::from_type_code`]; codes with no supported shape are kept as
//! [`ValueKind::Unsupported`] so the failure is raised when a value is actually
//! projected.

use serde::{Deserialize, Serialize};

/// Primitive value shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    String,
    Number,
    Bool,
    Date,
    DateTime,
}

/// Value shape of a single field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ValueKind {
    Scalar(ScalarKind),
    CodeableConcept,
    Coding,
    Identifier,
    HumanName,
    Address,
    ContactPoint,
    Reference,
    CodeableReference,
    Quantity,
    Age,
    Extension,
    ObservationComponent,
    TaskInput,
    TaskOutput,
    SampledData,
    Decimal,
    PatientCommunication,
    DocumentReferenceContent,
    FamilyMemberHistoryCondition,
    /// `Specimen.processing`; members are rendered by their own kinds
    SpecimenProcessing,
    /// A type code with no flattening rule
    Unsupported(String),
}

impl ValueKind {
    /// Map a FHIR type code (or backbone element class name) to its value kind
    pub fn from_type_code(code: &str) -> Self {
        match code {
            "string" | "code" | "id" | "markdown" | "uri" | "url" | "canonical" | "oid"
            | "uuid" | "base64Binary" | "time" | "xhtml" => Self::Scalar(ScalarKind::String),
            "integer" | "unsignedInt" | "positiveInt" | "integer64" => {
                Self::Scalar(ScalarKind::Number)
            }
            "boolean" => Self::Scalar(ScalarKind::Bool),
            "date" => Self::Scalar(ScalarKind::Date),
            "dateTime" | "instant" => Self::Scalar(ScalarKind::DateTime),
            "decimal" => Self::Decimal,
            "CodeableConcept" => Self::CodeableConcept,
            "Coding" => Self::Coding,
            "Identifier" => Self::Identifier,
            "HumanName" => Self::HumanName,
            "Address" => Self::Address,
            "ContactPoint" => Self::ContactPoint,
            "Reference" => Self::Reference,
            "CodeableReference" => Self::CodeableReference,
            "Quantity" | "SimpleQuantity" | "Duration" | "Distance" | "Count" | "MoneyQuantity" => {
                Self::Quantity
            }
            "Age" => Self::Age,
            "Extension" => Self::Extension,
            "ObservationComponent" => Self::ObservationComponent,
            "TaskInput" => Self::TaskInput,
            "TaskOutput" => Self::TaskOutput,
            "SampledData" => Self::SampledData,
            "PatientCommunication" => Self::PatientCommunication,
            "DocumentReferenceContent" => Self::DocumentReferenceContent,
            "FamilyMemberHistoryCondition" => Self::FamilyMemberHistoryCondition,
            "SpecimenProcessing" => Self::SpecimenProcessing,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Map the type suffix of a choice element name to its value kind
    /// (`valueQuantity` -> `Quantity`, `valueString` -> `string`)
    pub fn from_choice_suffix(suffix: &str) -> Self {
        // primitive type codes are lower camel case
        match Self::from_type_code(&lower_first(suffix)) {
            kind @ (Self::Scalar(_) | Self::Decimal) => kind,
            _ => Self::from_type_code(suffix),
        }
    }

    /// Whether values of this kind carry a resource reference
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference | Self::CodeableReference)
    }

    /// Whether the projector derives output names from the value content
    /// rather than from the list position
    pub fn names_from_content(&self) -> bool {
        matches!(
            self,
            Self::Extension | Self::ObservationComponent | Self::TaskInput | Self::TaskOutput
        )
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Short name used in diagnostics and schema descriptions
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(ScalarKind::String) => "string",
            Self::Scalar(ScalarKind::Number) => "number",
            Self::Scalar(ScalarKind::Bool) => "boolean",
            Self::Scalar(ScalarKind::Date) => "date",
            Self::Scalar(ScalarKind::DateTime) => "dateTime",
            Self::CodeableConcept => "CodeableConcept",
            Self::Coding => "Coding",
            Self::Identifier => "Identifier",
            Self::HumanName => "HumanName",
            Self::Address => "Address",
            Self::ContactPoint => "ContactPoint",
            Self::Reference => "Reference",
            Self::CodeableReference => "CodeableReference",
            Self::Quantity => "Quantity",
            Self::Age => "Age",
            Self::Extension => "Extension",
            Self::ObservationComponent => "ObservationComponent",
            Self::TaskInput => "TaskInput",
            Self::TaskOutput => "TaskOutput",
            Self::SampledData => "SampledData",
            Self::Decimal => "Decimal",
            Self::PatientCommunication => "PatientCommunication",
            Self::DocumentReferenceContent => "DocumentReferenceContent",
            Self::FamilyMemberHistoryCondition => "FamilyMemberHistoryCondition",
            Self::SpecimenProcessing => "SpecimenProcessing",
            Self::Unsupported(code) => code,
        }
    }
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
