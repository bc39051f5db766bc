//! Reference capture and id rendering
//!
//! Every `reference` string reachable from a resource's declared fields is
//! captured while the resource is projected; the projector turns the captured
//! references into record relations. How ids are rendered into records is
//! decided by a [`ReferenceStrategy`].

use ferrum_models::ResourceTypeDescriptor;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Namespace for study-scoped ids
pub static STUDY_NAMESPACE: Lazy<Uuid> =
    Lazy::new(|| Uuid::new_v3(&Uuid::NAMESPACE_DNS, b"aced-ipd.org"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `Type/id` or a bare id
    Relative,
    /// `http(s)://.../Type/id` or `urn:...`
    Absolute,
    /// `#id` into contained resources
    Fragment,
    /// `url|version`
    Canonical,
}

/// Parsed reference string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    pub kind: ReferenceKind,
    /// Empty when the reference carries no type
    pub target_type: String,
    pub target_id: String,
}

/// An outgoing reference found in a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CapturedReference {
    pub dest_id: String,
    pub dest_type: String,
}

fn looks_like_absolute_url(s: &str) -> bool {
    s.contains("://")
}

/// Parse a reference string.
///
/// Supports:
/// - Relative: `id`, `Type/id`, `Type/id/_history/version`
/// - Absolute: `http(s)://.../Type/id`, `urn:uuid:...`
/// - Fragment: `#id`
/// - Canonical: `url|version`
pub fn parse_reference(reference: &str) -> Option<ReferenceTarget> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if let Some((base, _version)) = reference.split_once('|') {
        let base = base.trim_end_matches('/').trim();
        if !base.is_empty() && (looks_like_absolute_url(base) || base.starts_with("urn:")) {
            return Some(ReferenceTarget {
                kind: ReferenceKind::Canonical,
                target_type: String::new(),
                target_id: base.to_string(),
            });
        }
    }

    if let Some(id) = reference.strip_prefix('#') {
        return Some(ReferenceTarget {
            kind: ReferenceKind::Fragment,
            target_type: String::new(),
            target_id: id.to_string(),
        });
    }

    let reference = reference.trim_end_matches('/');
    let parts: Vec<&str> = reference
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();

    let kind = if looks_like_absolute_url(reference) || reference.starts_with("urn:") {
        ReferenceKind::Absolute
    } else {
        ReferenceKind::Relative
    };

    let (target_type, target_id) = match parts.as_slice() {
        [] => return None,
        [.., ty, id, "_history", _] => (*ty, *id),
        [.., ty, id] => (*ty, *id),
        [id] => ("", *id),
    };

    // `http:` is a scheme, not a type
    let target_type = if target_type.ends_with(':') { "" } else { target_type };

    Some(ReferenceTarget {
        kind,
        target_type: target_type.to_string(),
        target_id: target_id.to_string(),
    })
}

/// How references are captured and how ids appear in records
pub trait ReferenceStrategy: Send + Sync {
    /// Capture a reference string. The default captures typed relative and
    /// absolute references.
    fn capture(&self, reference: &str) -> Option<CapturedReference> {
        let target = parse_reference(reference)?;
        match target.kind {
            ReferenceKind::Relative | ReferenceKind::Absolute if !target.target_type.is_empty() => {
                Some(CapturedReference {
                    dest_id: target.target_id,
                    dest_type: target.target_type,
                })
            }
            _ => None,
        }
    }

    /// Render a resource id as written to records
    fn render_id(&self, id: &str) -> String;
}

/// Ids are written as they appear in the source
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeReferences;

impl ReferenceStrategy for RelativeReferences {
    fn render_id(&self, id: &str) -> String {
        id.to_string()
    }
}

/// Ids are rewritten to name-based UUIDs scoped by a study, so a study can
/// be loaded a second time under fresh ids
#[derive(Debug, Clone, Copy)]
pub struct StudyScopedIds {
    study: Uuid,
}

impl StudyScopedIds {
    pub fn new(study: &str) -> Self {
        Self {
            study: Uuid::new_v5(&STUDY_NAMESPACE, study.as_bytes()),
        }
    }

    pub fn study(&self) -> Uuid {
        self.study
    }
}

impl ReferenceStrategy for StudyScopedIds {
    fn render_id(&self, id: &str) -> String {
        Uuid::new_v5(&self.study, id.as_bytes()).to_string()
    }
}

/// Capture references from the declared fields of a resource, in field order
pub(crate) fn collect_references<S: ReferenceStrategy + ?Sized>(
    strategy: &S,
    descriptor: &ResourceTypeDescriptor,
    body: &Map<String, Value>,
) -> Vec<CapturedReference> {
    let mut captured = Vec::new();
    for field in &descriptor.fields {
        if let Some(value) = body.get(&field.name) {
            collect_into(strategy, value, &mut captured);
        }
    }
    captured
}

fn collect_into<S: ReferenceStrategy + ?Sized>(
    strategy: &S,
    value: &Value,
    captured: &mut Vec<CapturedReference>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_into(strategy, item, captured);
            }
        }
        Value::Object(obj) => {
            if let Some(reference) = obj.get("reference").and_then(Value::as_str) {
                if let Some(capture) = strategy.capture(reference) {
                    captured.push(capture);
                }
            }
            for (key, child) in obj {
                if key == "reference" && child.is_string() {
                    continue;
                }
                collect_into(strategy, child, captured);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_models::{FieldDescriptor, ValueKind};
    use serde_json::json;

    #[test]
    fn test_parse_relative_absolute_and_canonical() {
        let r = parse_reference("Patient/123").unwrap();
        assert_eq!(r.kind, ReferenceKind::Relative);
        assert_eq!(r.target_type, "Patient");
        assert_eq!(r.target_id, "123");

        let r = parse_reference("Patient/123/_history/1").unwrap();
        assert_eq!(r.target_type, "Patient");
        assert_eq!(r.target_id, "123");

        let r = parse_reference("http://example.org/fhir/Patient/123").unwrap();
        assert_eq!(r.kind, ReferenceKind::Absolute);
        assert_eq!(r.target_type, "Patient");
        assert_eq!(r.target_id, "123");

        let r = parse_reference("http://example.org/canon|1.2.3").unwrap();
        assert_eq!(r.kind, ReferenceKind::Canonical);

        let r = parse_reference("#contained-1").unwrap();
        assert_eq!(r.kind, ReferenceKind::Fragment);

        assert!(parse_reference("  ").is_none());
    }

    #[test]
    fn test_untyped_references_are_not_captured() {
        let strategy = RelativeReferences;
        assert!(strategy.capture("urn:uuid:6f1c1b9e-7c1f-4a34-9d1f-3a1e2b6f1c1b").is_none());
        assert!(strategy.capture("#p1").is_none());
        assert!(strategy.capture("123").is_none());
        assert_eq!(
            strategy.capture("Specimen/s1"),
            Some(CapturedReference {
                dest_id: "s1".to_string(),
                dest_type: "Specimen".to_string(),
            })
        );
    }

    #[test]
    fn test_study_scoped_ids_are_stable() {
        let strategy = StudyScopedIds::new("ohsu-study");
        let id = strategy.render_id("p1");
        assert_eq!(id, strategy.render_id("p1"));
        assert_ne!(id, StudyScopedIds::new("other-study").render_id("p1"));
        assert_eq!(Uuid::parse_str(&id).unwrap().get_version_num(), 5);
        assert_eq!(STUDY_NAMESPACE.get_version_num(), 3);
    }

    #[test]
    fn test_collect_nested_references_in_field_order() {
        let descriptor = ferrum_models::ResourceTypeDescriptor::new("Task")
            .with_field(FieldDescriptor::new("for", ValueKind::Reference))
            .with_field(FieldDescriptor::new("input", ValueKind::TaskInput).list());
        let body = json!({
            "input": [{"type": {"text": "file"}, "valueReference": {"reference": "DocumentReference/d1"}}],
            "for": {"reference": "Patient/p1"},
            "contained": [{"resourceType": "Patient", "link": {"reference": "Patient/p9"}}]
        });
        let captured = collect_references(&RelativeReferences, &descriptor, body.as_object().unwrap());
        let ids: Vec<_> = captured.iter().map(|c| c.dest_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "d1"]);
    }
}
