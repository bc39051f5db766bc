use super::write_file;
use anyhow::Context;
use ferrum_models::loader;
use std::path::Path;

pub fn descriptors(input: &Path, output: &Path) -> anyhow::Result<()> {
    let table = loader::load_dir(input)
        .with_context(|| format!("Failed to load StructureDefinitions from {}", input.display()))?;
    if table.is_empty() {
        anyhow::bail!("No resource StructureDefinitions found in {}", input.display());
    }

    write_file(output, &table.to_json_pretty()?)?;
    tracing::info!(types = table.len(), output = %output.display(), "wrote descriptor table");
    Ok(())
}
