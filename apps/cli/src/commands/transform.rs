use super::{load_config, load_table, write_file};
use anyhow::Context;
use ferrum_flatten::{Projection, Projector, ProjectorConfig, ReferenceStrategy, StudyScopedIds};
use ferrum_graph::GraphSchema;
use ferrum_models::{Bundle, Diagnostics, PermittedFields, ProvisionalField};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROVISIONAL_FILE: &str = "provisional.json";

#[derive(Debug, Clone)]
pub struct TransformArgs {
    pub input: PathBuf,
    pub table: PathBuf,
    pub schema: PathBuf,
    pub config: Option<PathBuf>,
    pub output: PathBuf,
    pub study: Option<String>,
    pub accept_provisional: bool,
}

/// Projected records of one run, grouped by resource type
#[derive(Default)]
struct Batch {
    records: BTreeMap<String, Vec<String>>,
    provisional: BTreeSet<ProvisionalField>,
    diagnostics: Diagnostics,
    not_in_schema: usize,
    failed: usize,
}

pub fn transform(args: &TransformArgs) -> anyhow::Result<()> {
    let table = Arc::new(load_table(&args.table)?);
    let mut schema = GraphSchema::load(&args.schema)
        .with_context(|| format!("Failed to load graph schema {}", args.schema.display()))?;
    let config = load_config(args.config.as_deref())?;

    let projector_config = ProjectorConfig {
        identifier_slots: config.identifier_slots,
        ignored_properties: config.ignored_properties.clone(),
    };
    let permitted: HashMap<String, PermittedFields> = schema
        .vertices
        .keys()
        .filter_map(|name| schema.permitted(name).map(|fields| (name.clone(), fields)))
        .collect();

    let resources = read_resources(&args.input)?;
    tracing::info!(resources = resources.len(), input = %args.input.display(), "read resources");

    let batch = match &args.study {
        Some(study) => {
            let projector = Projector::with_strategy(table, StudyScopedIds::new(study))
                .with_config(projector_config);
            project_all(&projector, &resources, &permitted)?
        }
        None => {
            let projector = Projector::new(table).with_config(projector_config);
            project_all(&projector, &resources, &permitted)?
        }
    };

    for (type_name, lines) in &batch.records {
        let path = args.output.join(format!("{}.ndjson", type_name));
        let mut contents = lines.join("\n");
        contents.push('\n');
        write_file(&path, &contents)?;
        tracing::info!(resource_type = %type_name, records = lines.len(), "wrote records");
    }

    if !batch.provisional.is_empty() {
        let fields: Vec<&ProvisionalField> = batch.provisional.iter().collect();
        write_file(
            &args.output.join(PROVISIONAL_FILE),
            &serde_json::to_string_pretty(&fields)?,
        )?;

        if args.accept_provisional {
            let added = schema.accept_provisional(&batch.provisional)?;
            write_file(&args.schema, &schema.to_json_pretty()?)?;
            tracing::info!(added, schema = %args.schema.display(), "accepted provisional fields");
        } else {
            tracing::warn!(
                fields = batch.provisional.len(),
                "provisional fields not in schema; rerun with --accept-provisional to add them"
            );
        }
    }

    if batch.not_in_schema > 0 {
        tracing::warn!(resources = batch.not_in_schema, "skipped resources whose type is not a schema vertex");
    }
    if batch.failed > 0 {
        tracing::warn!(resources = batch.failed, "resources could not be projected");
    }
    tracing::info!(
        types = batch.records.len(),
        warnings = batch.diagnostics.len(),
        output = %args.output.display(),
        "transform complete"
    );
    Ok(())
}

fn project_all<S: ReferenceStrategy>(
    projector: &Projector<S>,
    resources: &[Value],
    permitted: &HashMap<String, PermittedFields>,
) -> anyhow::Result<Batch> {
    let results: Vec<Option<ferrum_flatten::Result<Projection>>> = resources
        .par_iter()
        .map(|resource| {
            let type_name = resource
                .get("resourceType")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let fields = permitted.get(type_name)?;
            Some(projector.project_value(resource.clone(), fields))
        })
        .collect();

    let mut batch = Batch::default();
    for result in results {
        match result {
            Some(Ok(projection)) => {
                let line = projection.record.to_ndjson()?;
                batch
                    .records
                    .entry(projection.record.name)
                    .or_default()
                    .push(line);
                batch.provisional.extend(projection.provisional);
                batch.diagnostics.extend(projection.warnings);
            }
            Some(Err(err)) => {
                tracing::warn!(error = %err, "record not projected");
                batch.failed += 1;
            }
            None => batch.not_in_schema += 1,
        }
    }
    Ok(batch)
}

/// Resources from an NDJSON file, a JSON resource, array or Bundle, or a
/// directory of such files
fn read_resources(input: &Path) -> anyhow::Result<Vec<Value>> {
    if !input.is_dir() {
        return read_file(input);
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(input)
        .with_context(|| format!("Failed to read directory {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| matches!(path.extension().and_then(|e| e.to_str()), Some("ndjson" | "json")))
        .collect();
    paths.sort();

    let mut resources = Vec::new();
    for path in paths {
        resources.extend(read_file(&path)?);
    }
    Ok(resources)
}

fn read_file(path: &Path) -> anyhow::Result<Vec<Value>> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if path.extension().and_then(|e| e.to_str()) == Some("ndjson") {
        return contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Invalid JSON at {}:{}", path.display(), i + 1))
            })
            .collect();
    }

    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(match value {
        Value::Array(items) => items,
        value if Bundle::is_bundle(&value) => {
            let bundle: Bundle = serde_json::from_value(value)?;
            bundle.into_resources().collect()
        }
        value => vec![value],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_graph::{synthesize, GraphConfig};
    use ferrum_models::{DescriptorTable, FieldDescriptor, ResourceTypeDescriptor, ValueKind};
    use serde_json::json;

    fn write_inputs(dir: &Path) -> TransformArgs {
        let table: DescriptorTable = [
            ResourceTypeDescriptor::new("Patient")
                .with_field(FieldDescriptor::new("identifier", ValueKind::Identifier).list()),
            ResourceTypeDescriptor::new("Observation")
                .with_field(FieldDescriptor::new("code", ValueKind::CodeableConcept))
                .with_field(FieldDescriptor::new("subject", ValueKind::Reference).targets(["Patient"]))
                .with_field(FieldDescriptor::new("component", ValueKind::ObservationComponent).list()),
        ]
        .into_iter()
        .collect();
        let config = GraphConfig::default();
        let outcome = synthesize(&table, &config).unwrap();
        let schema = GraphSchema::assemble(&table, &outcome.graph, &config);

        let table_path = dir.join("table.json");
        let schema_path = dir.join("schema.json");
        fs::write(&table_path, table.to_json_pretty().unwrap()).unwrap();
        fs::write(&schema_path, schema.to_json_pretty().unwrap()).unwrap();

        let resources = [
            json!({"resourceType": "Patient", "id": "p1", "identifier": [{"system": "sys1", "value": "123"}]}),
            json!({
                "resourceType": "Observation",
                "id": "o1",
                "code": {"text": "Heart rate"},
                "subject": {"reference": "Patient/p1"},
                "component": [{"code": {"text": "Beats"}, "valueQuantity": {"value": 72, "unit": "/min"}}]
            }),
            json!({"resourceType": "Device", "id": "d1"}),
        ];
        let ndjson: Vec<String> = resources.iter().map(|r| r.to_string()).collect();
        let input = dir.join("resources.ndjson");
        fs::write(&input, ndjson.join("\n")).unwrap();

        TransformArgs {
            input,
            table: table_path,
            schema: schema_path,
            config: None,
            output: dir.join("out"),
            study: None,
            accept_provisional: false,
        }
    }

    fn read_records(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_transform_writes_records_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_inputs(dir.path());
        transform(&args).unwrap();

        let patients = read_records(&args.output.join("Patient.ndjson"));
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0]["object"]["identifier"], "sys1#123");

        let observations = read_records(&args.output.join("Observation.ndjson"));
        assert_eq!(observations[0]["relations"], json!([{"dst_id": "p1", "dst_name": "Patient"}]));
        assert_eq!(observations[0]["object"]["beats_value"], json!(72.0));

        assert!(!args.output.join("Device.ndjson").exists());
        assert!(args.output.join(PROVISIONAL_FILE).exists());
    }

    #[test]
    fn test_accept_provisional_updates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let args = TransformArgs {
            accept_provisional: true,
            ..write_inputs(dir.path())
        };
        transform(&args).unwrap();

        let schema = GraphSchema::load(&args.schema).unwrap();
        let observation = schema.vertex("Observation").unwrap();
        assert!(observation.properties.contains_key("beats"));
        assert!(observation.properties.contains_key("beats_value"));
        assert!(observation.properties.contains_key("beats_unit"));
    }

    #[test]
    fn test_study_scoped_transform() {
        let dir = tempfile::tempdir().unwrap();
        let args = TransformArgs {
            study: Some("ohsu".to_string()),
            ..write_inputs(dir.path())
        };
        transform(&args).unwrap();

        let strategy = StudyScopedIds::new("ohsu");
        let observations = read_records(&args.output.join("Observation.ndjson"));
        assert_eq!(observations[0]["id"], strategy.render_id("o1"));
        assert_eq!(observations[0]["relations"][0]["dst_id"], strategy.render_id("p1"));
    }

    #[test]
    fn test_read_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        fs::write(
            &path,
            json!({
                "resourceType": "Bundle",
                "type": "collection",
                "entry": [
                    {"resource": {"resourceType": "Patient", "id": "p1"}},
                    {"resource": {"resourceType": "Patient", "id": "p2"}}
                ]
            })
            .to_string(),
        )
        .unwrap();
        let resources = read_resources(dir.path()).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[1]["id"], "p2");
    }
}
