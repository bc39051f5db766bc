use super::{load_config, load_table, write_file};
use ferrum_graph::synthesize;
use std::path::Path;

const INBOUND_FILE: &str = "edges.sif.inbound.tsv";
const PRIMARY_FILE: &str = "edges.sif.primary.tsv";

/// Write every edge and the primary edges as two SIF files
pub fn cytoscape(table_path: &Path, config_path: Option<&Path>, output: &Path) -> anyhow::Result<()> {
    let table = load_table(table_path)?;
    let config = load_config(config_path)?;
    let outcome = synthesize(&table, &config)?;

    write_file(&output.join(INBOUND_FILE), &outcome.graph.to_sif(false))?;
    write_file(&output.join(PRIMARY_FILE), &outcome.graph.to_sif(true))?;

    tracing::info!(
        edges = outcome.graph.edge_count(),
        output = %output.display(),
        "wrote SIF files"
    );
    Ok(())
}
