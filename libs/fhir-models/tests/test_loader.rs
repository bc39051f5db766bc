//! Descriptor extraction from StructureDefinition snapshots

use ferrum_models::loader::{parse_resources, parse_structure_definition};
use ferrum_models::{Multiplicity, ScalarKind, ValueKind};
use serde_json::{json, Value};

fn observation_sd() -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": "http://hl7.org/fhir/StructureDefinition/Observation",
        "name": "Observation",
        "kind": "resource",
        "abstract": false,
        "type": "Observation",
        "description": "Measurements and simple assertions\n made about a patient.",
        "snapshot": {
            "element": [
                {"path": "Observation", "min": 0, "max": "*"},
                {
                    "path": "Observation.id",
                    "min": 0,
                    "max": "1",
                    "type": [{"code": "http://hl7.org/fhirpath/System.String"}]
                },
                {
                    "path": "Observation.identifier",
                    "short": "Business Identifier for observation",
                    "min": 0,
                    "max": "*",
                    "type": [{"code": "Identifier"}]
                },
                {
                    "path": "Observation.code",
                    "min": 1,
                    "max": "1",
                    "type": [{"code": "CodeableConcept"}]
                },
                {
                    "path": "Observation.subject",
                    "short": "Who and/or what the observation is about",
                    "min": 0,
                    "max": "1",
                    "type": [{
                        "code": "Reference",
                        "targetProfile": [
                            "http://hl7.org/fhir/StructureDefinition/Patient",
                            "http://hl7.org/fhir/StructureDefinition/Group"
                        ]
                    }]
                },
                {
                    "path": "Observation.effective[x]",
                    "min": 0,
                    "max": "1",
                    "type": [{"code": "dateTime"}, {"code": "Period"}]
                },
                {
                    "path": "Observation.component",
                    "short": "Component results",
                    "min": 0,
                    "max": "*",
                    "type": [{"code": "BackboneElement"}]
                },
                {
                    "path": "Observation.component.code",
                    "min": 1,
                    "max": "1",
                    "type": [{"code": "CodeableConcept"}]
                },
                {
                    "path": "Observation.component.value[x]",
                    "min": 0,
                    "max": "1",
                    "type": [
                        {"code": "Quantity"},
                        {"code": "Reference", "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Specimen"]}
                    ]
                },
                {
                    "path": "Observation.component.referenceRange",
                    "min": 0,
                    "max": "*",
                    "contentReference": "#Observation.referenceRange"
                }
            ]
        }
    })
}

#[test]
fn parses_resource_fields_in_declaration_order() {
    let descriptors = parse_structure_definition(&observation_sd()).unwrap();
    let observation = &descriptors[0];
    assert_eq!(observation.name, "Observation");
    assert_eq!(
        observation.docstring.as_deref(),
        Some("Measurements and simple assertions made about a patient.")
    );

    let names: Vec<_> = observation.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "identifier",
            "code",
            "subject",
            "effectiveDateTime",
            "effectivePeriod",
            "component"
        ]
    );

    let id = observation.field("id").unwrap();
    assert_eq!(id.kind, ValueKind::Scalar(ScalarKind::String));

    let identifier = observation.field("identifier").unwrap();
    assert_eq!(identifier.multiplicity, Multiplicity::List);
    assert_eq!(
        identifier.docstring.as_deref(),
        Some("Business Identifier for observation")
    );

    assert!(observation.field("code").unwrap().required);

    let subject = observation.field("subject").unwrap();
    assert_eq!(subject.kind, ValueKind::Reference);
    assert_eq!(subject.target_types, vec!["Patient", "Group"]);

    assert_eq!(
        observation.field("effectivePeriod").unwrap().kind,
        ValueKind::Unsupported("Period".to_string())
    );
    assert_eq!(
        observation.field("component").unwrap().kind,
        ValueKind::ObservationComponent
    );
}

#[test]
fn parses_backbone_elements_as_their_own_types() {
    let descriptors = parse_structure_definition(&observation_sd()).unwrap();
    assert_eq!(descriptors.len(), 2);

    let component = &descriptors[1];
    assert_eq!(component.name, "ObservationComponent");
    assert_eq!(component.docstring.as_deref(), Some("Component results"));

    let names: Vec<_> = component.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["code", "valueQuantity", "valueReference"]);
    assert_eq!(
        component.field("valueReference").unwrap().target_types,
        vec!["Specimen"]
    );
}

#[test]
fn skips_profiles_abstract_types_and_other_resources() {
    let mut profile = observation_sd();
    profile["derivation"] = json!("constraint");
    profile["name"] = json!("VitalSigns");

    let abstract_sd = json!({
        "resourceType": "StructureDefinition",
        "name": "DomainResource",
        "kind": "resource",
        "abstract": true,
        "snapshot": {"element": []}
    });

    let bundle = json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {"resource": observation_sd()},
            {"resource": profile},
            {"resource": abstract_sd},
            {"resource": {"resourceType": "ValueSet", "id": "vs"}}
        ]
    });

    let table = parse_resources([&bundle]);
    let names: Vec<_> = table.type_names().collect();
    assert_eq!(names, vec!["Observation", "ObservationComponent"]);
}
