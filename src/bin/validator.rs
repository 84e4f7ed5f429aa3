//! Data Validator CLI
//!
//! Validates a JSON data instance against an object type of a schema and
//! optionally writes a fixed copy.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use graphql_shapes::config::ShapesConfig;
use graphql_shapes::graph::load_from_path;
use graphql_shapes::validate::{apply_fixes, Validator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shape-validator")]
#[command(about = "Validate JSON data against a GraphQL object type")]
struct Cli {
    /// Schema file or directory (introspection or plain JSON)
    #[arg(short, long)]
    schema: PathBuf,

    /// JSON data instance
    #[arg(short, long)]
    data: PathBuf,

    /// Root object type the data should match
    #[arg(short, long)]
    root: String,

    /// Config file (defaults to shapes.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Apply fix actions and write the fixed data here
    #[arg(long)]
    fix: Option<PathBuf>,

    /// Print one line per diagnostic instead of JSON
    #[arg(long)]
    text: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

/// Returns whether the data was valid
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ShapesConfig::load_from(cli.config.as_deref()).context("Failed to load config")?;
    let graph = load_from_path(&cli.schema)?;

    let content = std::fs::read_to_string(&cli.data)
        .with_context(|| format!("Failed to read data: {}", cli.data.display()))?;
    let mut data: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse data: {}", cli.data.display()))?;

    let validator = Validator::new(&graph, config.validation_options());
    let result = validator.validate(&data, &cli.root)?;

    if cli.text {
        print!("{}", result.format_all());
        if result.valid {
            println!("✅ {} matches {}", cli.data.display(), cli.root);
        } else {
            println!("❌ {} diagnostic(s) against {}", result.diagnostic_count(), cli.root);
        }
    } else {
        println!("{}", config.export.output_format.render(&result)?);
    }

    if let Some(out) = cli.fix {
        let applied = apply_fixes(&mut data, &graph, &result)?;
        let rendered = config.export.output_format.render(&data)?;
        std::fs::write(&out, rendered)
            .with_context(|| format!("Failed to write fixed data: {}", out.display()))?;
        eprintln!("🔧 Applied {} fix(es), wrote {}", applied, out.display());

        let after = validator.validate(&data, &cli.root)?;
        if !after.valid {
            eprintln!(
                "⚠️  {} diagnostic(s) remain after fixing",
                after.diagnostic_count()
            );
        }
    }

    Ok(result.valid)
}
