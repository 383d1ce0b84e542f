//! rq CLI: resolve modules from the command line.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rq_loader::LoaderConfig;
use tracing_subscriber::EnvFilter;

use manifest::RqManifest;

#[derive(Parser)]
#[command(name = "rq", version, about = "Resolve and evaluate rq modules")]
struct Cli {
    /// Base location for module locators (overrides rq.toml)
    #[arg(long, global = true)]
    base: Option<String>,
    /// Path alias for a module, as ID=PATH (repeatable)
    #[arg(long = "path", global = true, value_parser = parse_alias)]
    paths: Vec<(String, String)>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve modules and print their values in order
    Require {
        /// Module ids (default: `main` from rq.toml)
        ids: Vec<String>,
    },
    /// Resolve one module and print its value
    Import {
        /// Module id
        id: String,
    },
    /// Print the locator each module would be fetched from
    Locate {
        /// Module ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Resolve a module and print its dependency tree
    Tree {
        /// Module id
        id: String,
    },
}

fn parse_alias(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => {
            Ok((id.to_string(), path.to_string()))
        }
        _ => Err(format!("expected ID=PATH, got '{s}'")),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// Merge the manifest's loader settings with command-line overrides.
/// `--base` replaces the base; `--path` aliases replace same-id entries.
fn merge_config(
    project: Option<&(RqManifest, PathBuf)>,
    base: Option<String>,
    paths: Vec<(String, String)>,
) -> LoaderConfig {
    let mut config = match project {
        Some((manifest, dir)) => manifest.loader_config(dir),
        None => LoaderConfig::default(),
    };
    if let Some(base) = base {
        config.base_url = base;
    }
    config.paths.extend(paths);
    config
}

/// Ids named on the command line, or the manifest's `main` list.
fn required_ids(ids: Vec<String>, project: Option<(RqManifest, PathBuf)>) -> Result<Vec<String>> {
    let ids = if ids.is_empty() {
        project.map(|(manifest, _)| manifest.main).unwrap_or_default()
    } else {
        ids
    };
    if ids.is_empty() {
        bail!("no modules to require; name some or set `main` in rq.toml");
    }
    Ok(ids)
}

async fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let project = RqManifest::find_and_load(&cwd)?;

    let loader = rq_loader::global();
    loader.config(merge_config(project.as_ref(), cli.base, cli.paths));

    match cli.command {
        Commands::Require { ids } => {
            let ids = required_ids(ids, project)?;
            print!("{}", commands::require::require(loader, &ids).await?);
            Ok(())
        }
        Commands::Import { id } => {
            print!("{}", commands::require::import(loader, &id).await?);
            Ok(())
        }
        Commands::Locate { ids } => {
            print!("{}", commands::locate::locate(loader, &ids));
            Ok(())
        }
        Commands::Tree { id } => commands::tree::run(loader, &id).await,
    }
}
