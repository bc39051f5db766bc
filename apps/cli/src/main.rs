//! fhir-graph
//!
//! Builds graph schemas from FHIR type definitions and flattens FHIR
//! resources into per-type NDJSON records that follow them.

mod commands;
mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fhir-graph")]
#[command(version, about = "FHIR reference graphs and flat records")]
#[command(
    long_about = "Builds a property-graph schema from FHIR StructureDefinitions and flattens \
FHIR resources into records that follow it.\n\
\n\
Examples:\n  \
fhir-graph descriptors definitions/ -o table.json\n  \
fhir-graph schema -t table.json -c graph.yaml -o schema.json\n  \
fhir-graph transform -t table.json -s schema.json resources/ -o records/\n  \
fhir-graph cytoscape -t table.json -c graph.yaml -o sif/"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive a type descriptor table from StructureDefinitions
    Descriptors {
        /// Directory of StructureDefinition JSON files (resources, arrays or Bundles)
        input: PathBuf,

        /// Output file for the descriptor table
        #[arg(short, long, default_value = "descriptors.json")]
        output: PathBuf,
    },

    /// Synthesize the reference graph and write the graph schema
    Schema {
        /// Descriptor table
        #[arg(short, long)]
        table: PathBuf,

        /// Graph configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for the schema
        #[arg(short, long, default_value = "schema.json")]
        output: PathBuf,

        /// Write the schema even when some type pairs have no primary edge
        #[arg(long)]
        allow_ambiguous: bool,
    },

    /// Flatten resources into per-type NDJSON records
    Transform {
        /// NDJSON file, JSON resource or Bundle, or a directory of them
        input: PathBuf,

        /// Descriptor table
        #[arg(short, long)]
        table: PathBuf,

        /// Graph schema
        #[arg(short, long)]
        schema: PathBuf,

        /// Graph configuration (YAML); supplies identifier slots and ignored fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for `<Type>.ndjson` files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Rewrite ids to UUIDs scoped by this study name
        #[arg(long)]
        study: Option<String>,

        /// Add provisional fields to the schema file
        #[arg(long)]
        accept_provisional: bool,
    },

    /// Export the reference graph as Cytoscape SIF files
    Cytoscape {
        /// Descriptor table
        #[arg(short, long)]
        table: PathBuf,

        /// Graph configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose, cli.log_json) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        tracing::error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    match cli.command {
        Commands::Descriptors { input, output } => commands::descriptors(&input, &output),
        Commands::Schema {
            table,
            config,
            output,
            allow_ambiguous,
        } => commands::schema(&table, config.as_deref(), &output, allow_ambiguous),
        Commands::Transform {
            input,
            table,
            schema,
            config,
            output,
            study,
            accept_provisional,
        } => commands::transform(&commands::TransformArgs {
            input,
            table,
            schema,
            config,
            output,
            study,
            accept_provisional,
        }),
        Commands::Cytoscape {
            table,
            config,
            output,
        } => commands::cytoscape(&table, config.as_deref(), &output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_transform() {
        let cli = Cli::try_parse_from([
            "fhir-graph",
            "-vv",
            "transform",
            "resources/",
            "-t",
            "table.json",
            "-s",
            "schema.json",
            "--study",
            "ohsu",
            "-j",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(4));
        match cli.command {
            Commands::Transform {
                input,
                study,
                accept_provisional,
                output,
                ..
            } => {
                assert_eq!(input, PathBuf::from("resources/"));
                assert_eq!(study.as_deref(), Some("ohsu"));
                assert!(!accept_provisional);
                assert_eq!(output, PathBuf::from("output"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
