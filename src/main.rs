//! packsel - Main entry point
//!
//! Thin automated front-end over the selection engine: loads a descriptor,
//! applies selections and prints the resolved install set.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use packsel::cli::{Cli, Commands};
use packsel::{BlockCause, InstallDescriptor, RulesCollaborator, SelectionEngine, SelectionState};

/// Initialize the logger with appropriate settings
fn init_logger() {
    // RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();
}

#[derive(Serialize)]
struct PackReport<'a> {
    name: &'a str,
    size: u64,
    state: SelectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocked_by: Option<BlockCause>,
}

#[derive(Serialize)]
struct Report<'a> {
    packs: Vec<PackReport<'a>>,
    install_set: Vec<&'a str>,
    total_bytes: u64,
    installed_bytes: u64,
}

impl<'a> Report<'a> {
    fn from_engine<R: RulesCollaborator>(engine: &'a SelectionEngine<R>) -> Self {
        Self {
            packs: engine
                .states()
                .map(|(id, pack, state)| PackReport {
                    name: &pack.name,
                    size: pack.size,
                    state,
                    blocked_by: engine.block_cause(id),
                })
                .collect(),
            install_set: engine.install_set_names(),
            total_bytes: engine.total_bytes(),
            installed_bytes: engine.installed_bytes(),
        }
    }

    fn print_text(&self) {
        for pack in &self.packs {
            let state = match pack.blocked_by {
                Some(cause) => format!("{} ({})", pack.state, cause),
                None => pack.state.to_string(),
            };
            println!("  {:<24} {:>12}  {}", pack.name, pack.size, state);
        }
        println!();
        println!("Install set: {}", self.install_set.join(", "));
        println!("Total bytes: {}", self.total_bytes);
        if self.installed_bytes > 0 {
            println!("Already installed bytes: {}", self.installed_bytes);
        }
    }
}

fn validate(path: &Path) -> Result<()> {
    info!("Validating descriptor: {:?}", path);
    let descriptor = InstallDescriptor::load_from_file(path)?;
    descriptor.validate()?;
    descriptor.build_engine()?;
    println!("✓ Descriptor is valid: {} packs", descriptor.packs.len());
    Ok(())
}

fn resolve(
    path: &Path,
    select: &[String],
    deselect: &[String],
    vars: &[(String, String)],
    json: bool,
) -> Result<()> {
    let mut descriptor = InstallDescriptor::load_from_file(path)?;
    for (key, value) in vars {
        descriptor.variables.set(key.clone(), value.clone());
    }
    descriptor.validate()?;
    let mut engine = descriptor.build_engine()?;

    for name in select {
        debug!("Selecting {}", name);
        engine
            .toggle_by_name(name, true)
            .with_context(|| format!("Failed to select '{}'", name))?;
    }
    for name in deselect {
        debug!("Deselecting {}", name);
        engine
            .toggle_by_name(name, false)
            .with_context(|| format!("Failed to deselect '{}'", name))?;
    }

    let report = Report::from_engine(&engine);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        report.print_text();
    }
    Ok(())
}

fn main() {
    init_logger();

    let cli = Cli::parse_args();
    let result = match &cli.command {
        Commands::Validate { descriptor } => validate(descriptor),
        Commands::Resolve {
            descriptor,
            select,
            deselect,
            vars,
            json,
        } => resolve(descriptor, select, deselect, vars, *json),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
