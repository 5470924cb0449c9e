//! docgraph command-line tool
//!
//! Explains how a traversal is rewritten and pushed down to the document
//! store, without running it.

mod explain;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use docgraph_core::{Graph, GraphConfig, MemoryClient};
use formatter::OutputFormat;

/// docgraph command-line tool
#[derive(Parser, Debug)]
#[command(name = "docgraph")]
#[command(version, about = "Explain traversal pushdown for document-backed graphs")]
pub struct Args {
    /// Output format
    #[arg(long, default_value = "table", value_enum, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the rewritten steps, query text and pushdown support of a traversal
    Explain {
        /// Graph configuration file (JSON); defaults to a simple graph
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read the traversal from a file
        #[arg(short, long, conflicts_with = "traversal")]
        file: Option<PathBuf>,

        /// Traversal text, e.g. "g.V().has('age', gt(30))"
        traversal: Option<String>,
    },

    /// Validate a graph configuration and list its collections
    Config {
        /// Graph configuration file (JSON)
        path: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("docgraph=info".parse().expect("static directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        Command::Explain {
            config,
            file,
            traversal,
        } => {
            let source = match (file, traversal) {
                (Some(path), _) => std::fs::read_to_string(path)?,
                (None, Some(text)) => text,
                (None, None) => {
                    return Err("no traversal given; pass it as an argument or with --file".into())
                }
            };
            let graph = Graph::open(load_config(config.as_ref())?, MemoryClient::new())?;
            let explanation = explain::explain(&graph, &source)?;
            println!("{}", formatter::format_explanation(&explanation, args.format));
        }
        Command::Config { path } => {
            let config = GraphConfig::from_path(&path)?.validate()?;
            println!("{}", formatter::format_config(&config, args.format));
        }
    }
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<GraphConfig, docgraph_core::Error> {
    match path {
        Some(path) => GraphConfig::from_path(path),
        None => Ok(GraphConfig::new()),
    }
}
