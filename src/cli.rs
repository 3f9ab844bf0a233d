use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// packsel - resolve installer pack selections from a descriptor
#[derive(Parser)]
#[command(name = "packsel")]
#[command(about = "Resolve a consistent pack selection for an installation descriptor")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a descriptor file
    Validate {
        /// Path to the descriptor JSON file
        descriptor: PathBuf,
    },
    /// Apply selections to a descriptor and print the resolved install set
    Resolve {
        /// Path to the descriptor JSON file
        descriptor: PathBuf,

        /// Select a pack (repeatable, applied in order)
        #[arg(short, long = "select", value_name = "PACK")]
        select: Vec<String>,

        /// Deselect a pack (repeatable, applied after selections)
        #[arg(short, long = "deselect", value_name = "PACK")]
        deselect: Vec<String>,

        /// Set a variable before resolving (KEY=VALUE, repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
