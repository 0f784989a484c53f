//! Command-line interface for content-sync.
//!
//! Provides commands for syncing the content checkout once or continuously,
//! inspecting the document schemas, and classifying synced files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{self, ResolvedConfig};
use crate::schema::{registry, DocumentTypeDefinition, SourceDefinition};
use crate::sync::SyncLoop;

/// content-sync - content schemas and git-backed content sync
#[derive(Parser, Debug)]
#[command(name = "content-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clone or pull the content repository once
    Sync {
        /// Checkout directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Sync now, then keep syncing until interrupted
    Watch {
        /// Checkout directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Seconds between syncs (overrides configuration)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List document types, or show one in detail
    Schema {
        /// Document type name
        name: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify the files of a checkout and show their computed fields
    Scan {
        /// Checkout directory (defaults to the configured one)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Ignore the source's include list and active types
        #[arg(long)]
        all: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Sync { dir } => sync_once(dir).await,
            Commands::Watch { dir, interval } => watch(dir, interval).await,
            Commands::Schema { name, json } => show_schema(name.as_deref(), json),
            Commands::Scan { dir, all } => scan(dir, all),
            Commands::Config => show_config(),
        }
    }
}

fn content_dir(cfg: &ResolvedConfig, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| cfg.content_dir.clone())
}

/// Run a single sync cycle
async fn sync_once(dir: Option<PathBuf>) -> Result<()> {
    let cfg = config::config()?;
    let dir = content_dir(cfg, dir);

    let sync = SyncLoop::new(cfg.sync_settings());
    let command = sync
        .sync_once(&dir)
        .await
        .with_context(|| format!("Failed to sync {}", dir.display()))?;

    eprintln!("\n[Synced {} via `{}`]", dir.display(), command);
    Ok(())
}

/// Keep the checkout in sync until Ctrl-C
async fn watch(dir: Option<PathBuf>, interval: Option<u64>) -> Result<()> {
    let cfg = config::config()?;
    let dir = content_dir(cfg, dir);

    let mut settings = cfg.sync_settings();
    if let Some(secs) = interval {
        if secs == 0 {
            anyhow::bail!("Interval must be at least 1 second");
        }
        settings.interval = std::time::Duration::from_secs(secs);
    }

    let sync = SyncLoop::new(settings);
    let handle = sync.start(&dir).await?;

    tracing::info!(
        "Keeping {} in sync every {}s (Ctrl-C to stop)",
        dir.display(),
        sync.settings().interval.as_secs()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Stopping content sync...");
    let status = handle.stop().await?;

    eprintln!(
        "\n[{} sync cycles, {} failed]",
        status.cycles, status.failures
    );
    Ok(())
}

/// Print one or all document types
fn show_schema(name: Option<&str>, json: bool) -> Result<()> {
    let registry = registry()?;

    let definitions: Vec<&DocumentTypeDefinition> = match name {
        Some(name) => vec![registry.get(name).with_context(|| {
            format!(
                "Unknown document type '{}'. Known types: {}",
                name,
                registry.names().collect::<Vec<_>>().join(", ")
            )
        })?],
        None => registry.definitions().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    if name.is_none() {
        println!("{:<18} {:<22} {:<10}", "TYPE", "PATTERN", "FORMAT");
        println!("{}", "-".repeat(52));
        for def in &definitions {
            println!(
                "{:<18} {:<22} {:<10}",
                def.name, def.file_path_pattern, def.content_type
            );
        }
        return Ok(());
    }

    for def in definitions {
        println!("Type:    {}", def.name);
        println!("Pattern: {}", def.file_path_pattern);
        println!("Format:  {}", def.content_type);
        println!("\nFields:");
        for field in &def.fields {
            let mut line = format!("  {}: {}", field.name, field.field_type);
            if field.required {
                line.push_str(" (required)");
            }
            if let Some(ref default) = field.default {
                line.push_str(&format!(" [default: {}]", default));
            }
            println!("{}", line);
        }
        println!("\nComputed fields:");
        for computed in &def.computed_fields {
            println!("  {}: {}", computed.name, computed.field_type);
        }
    }

    Ok(())
}

/// List the documents a checkout would produce
fn scan(dir: Option<PathBuf>, all: bool) -> Result<()> {
    let cfg = config::config()?;
    let registry = registry()?;

    let dir = content_dir(cfg, dir);
    if !dir.is_dir() {
        anyhow::bail!(
            "Content directory {} does not exist. Run `content-sync sync` first",
            dir.display()
        );
    }

    let source = if all {
        SourceDefinition::everything(&dir, registry)
    } else {
        SourceDefinition {
            content_dir_path: dir.clone(),
            ..cfg.source()
        }
    };

    let documents = registry
        .collect(&dir, &source)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;

    if documents.is_empty() {
        println!("No documents found");
        return Ok(());
    }

    println!("{:<18} {:<40} {}", "TYPE", "FILE", "URL");
    println!("{}", "-".repeat(90));

    for (def, raw) in &documents {
        let computed = def.resolve_computed(raw)?;
        let url = computed
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        println!("{:<18} {:<40} {}", def.name, raw.source_file_path, url);
    }

    eprintln!("\n[{} documents]", documents.len());
    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;
    let source = cfg.source();

    println!("Content Sync Configuration");
    println!("{}", "=".repeat(40));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Sync:");
    println!("  Content dir: {}", cfg.content_dir.display());
    println!("  Remote:      {}", cfg.remote_url);
    println!("  Interval:    {}s", cfg.interval.as_secs());
    println!();
    println!("Source:");
    println!("  Include:        {}", source.content_dir_include.join(", "));
    println!("  Document types: {}", source.document_types.join(", "));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_with_interval() {
        let cli = Cli::try_parse_from(["content-sync", "watch", "--dir", "/tmp/x", "-i", "5"])
            .unwrap();
        match cli.command {
            Commands::Watch { dir, interval } => {
                assert_eq!(dir, Some(PathBuf::from("/tmp/x")));
                assert_eq!(interval, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_schema_by_name() {
        let cli = Cli::try_parse_from(["content-sync", "schema", "Course", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Schema { name: Some(ref n), json: true } if n == "Course"
        ));
    }

    #[test]
    fn test_unknown_schema_is_an_error() {
        let err = show_schema(Some("Nope"), false).unwrap_err();
        assert!(err.to_string().contains("Unknown document type 'Nope'"));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
