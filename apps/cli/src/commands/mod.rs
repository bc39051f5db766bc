//! Command implementations

mod cytoscape;
mod descriptors;
mod schema;
mod transform;

pub use cytoscape::cytoscape;
pub use descriptors::descriptors;
pub use schema::schema;
pub use transform::{transform, TransformArgs};

use anyhow::Context;
use ferrum_graph::GraphConfig;
use ferrum_models::DescriptorTable;
use std::fs;
use std::path::Path;

fn load_table(path: &Path) -> anyhow::Result<DescriptorTable> {
    DescriptorTable::load(path)
        .with_context(|| format!("Failed to load descriptor table {}", path.display()))
}

/// Graph configuration from a YAML file, or the defaults
fn load_config(path: Option<&Path>) -> anyhow::Result<GraphConfig> {
    match path {
        Some(path) => GraphConfig::load(path)
            .with_context(|| format!("Failed to load graph config {}", path.display())),
        None => Ok(GraphConfig::default()),
    }
}

/// Write a file, creating its parent directories
fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
