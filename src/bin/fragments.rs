//! Fragment Synthesis CLI
//!
//! Loads a schema, synthesizes fragments and prints JSON reports.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use graphql_shapes::config::ShapesConfig;
use graphql_shapes::fragments::{FragmentSynthesizer, OperationAssembler};
use graphql_shapes::graph::{find_duplicate_names, load_from_path, reference_cycles};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shape-fragments")]
#[command(about = "Synthesize fragments and operations from a GraphQL schema")]
struct Cli {
    /// Schema file or directory (introspection or plain JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// Config file (defaults to shapes.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every synthesized fragment
    Fragments {
        /// Override the configured synthesis depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Print operations for every declared root type
    Operations {
        /// Append the spread fragments to each operation
        #[arg(long)]
        documents: bool,
    },

    /// Report type names declared more than once
    Duplicates,

    /// Report groups of types that reference each other
    Cycles,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ShapesConfig::load_from(cli.config.as_deref()).context("Failed to load config")?;
    let graph = load_from_path(&cli.schema)?;
    tracing::info!(types = graph.type_count(), "schema loaded");

    let generated_at = chrono::Utc::now().to_rfc3339();

    let report = match cli.command {
        Commands::Fragments { max_depth } => {
            let mut options = config.synthesis_options();
            if let Some(depth) = max_depth {
                options.max_depth = depth;
            }
            let synthesis = FragmentSynthesizer::new(&graph, options).run();
            let digest = synthesis.fragments.digest();

            let mut report = json!({
                "generated_at": generated_at,
                "fragment_count": synthesis.fragments.len(),
                "truncated": synthesis.truncated,
                "fragments": &synthesis.fragments,
            });
            if config.export.include_digest {
                report["digest"] = json!(digest);
            }
            report
        }

        Commands::Operations { documents } => {
            let synthesis = FragmentSynthesizer::new(&graph, config.synthesis_options()).run();
            let assembler = OperationAssembler::new(&graph, &synthesis);

            let mut operations = assembler.assemble_all();
            if documents {
                for ops in operations.values_mut() {
                    for source in ops.values_mut() {
                        *source = assembler.document(source.as_str());
                    }
                }
            }

            let mut report = json!({
                "generated_at": generated_at,
                "operations": operations,
            });
            if config.export.include_digest {
                report["digest"] = json!(synthesis.fragments.digest());
            }
            report
        }

        Commands::Duplicates => {
            let duplicates = find_duplicate_names(&graph);
            json!({
                "generated_at": generated_at,
                "conflicting": duplicates.conflicting().count(),
                "duplicates": duplicates.names,
            })
        }

        Commands::Cycles => {
            let cycles = reference_cycles(&graph);
            json!({
                "generated_at": generated_at,
                "cycles": cycles,
            })
        }
    };

    let rendered = config.export.output_format.render(&report)?;
    match cli.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            eprintln!("✅ Report written to: {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
