use super::{load_config, load_table, write_file};
use ferrum_graph::{GraphSchema, Synthesizer};
use std::path::Path;

/// Synthesize the graph and write its schema. Ambiguous primary edges fail
/// the command unless `allow_ambiguous` is set.
pub fn schema(
    table_path: &Path,
    config_path: Option<&Path>,
    output: &Path,
    allow_ambiguous: bool,
) -> anyhow::Result<()> {
    let table = load_table(table_path)?;
    let config = load_config(config_path)?;

    let synthesizer = Synthesizer::new(config);
    let outcome = synthesizer.synthesize(&table)?;

    for report in &outcome.ambiguous {
        eprintln!("ambiguous: {}", report);
    }
    if !outcome.is_publishable() {
        if !allow_ambiguous {
            outcome.ensure_publishable()?;
        }
        tracing::warn!(
            pairs = outcome.ambiguous.len(),
            "writing schema without primary edges for ambiguous pairs"
        );
    }

    let schema = GraphSchema::assemble(&table, &outcome.graph, synthesizer.config());
    write_file(output, &schema.to_json_pretty()?)?;

    tracing::info!(
        vertices = schema.vertices.len(),
        edges = outcome.graph.edge_count(),
        warnings = outcome.warnings.len(),
        output = %output.display(),
        "wrote graph schema"
    );
    Ok(())
}
