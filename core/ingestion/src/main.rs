//! GPT Gulp - AI conversation archive
//!
//! Usage:
//!   gpt-gulp [--config <path>] <command>
//!
//! Commands:
//!   start           Run collectors and the sync loop until Ctrl-C
//!   stats           Show archive statistics
//!   list            List recent conversations
//!   export          Export conversations to the Obsidian vault
//!   setup-obsidian  Configure the Obsidian vault location

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gpt_gulp_ingestion::collector::VSCODE_PLATFORM;
use gpt_gulp_ingestion::{
    resolve_config_path, ConversationStore, GulpConfig, HeuristicEnricher, IngestionWorker,
    SyncWorker, VsCodeCollector,
};
use gpt_gulp_schemas::DEFAULT_PROJECT;
use gpt_gulp_vault::VaultExporter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const BROWSER_PLATFORMS: &[&str] = &["claude_ai", "chatgpt", "gemini", "perplexity"];
const EXPORT_RECENT_LIMIT: usize = 100;
const LIST_TITLE_CHARS: usize = 50;

#[derive(Parser, Debug)]
#[command(name = "gpt-gulp")]
#[command(about = "GPT Gulp - AI Conversation Archive System")]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start collectors and the periodic sync loop
    Start,
    /// Show collection statistics
    Stats,
    /// List recent conversations
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Export conversations to Obsidian
    Export {
        /// Only export this project
        #[arg(long)]
        project: Option<String>,
    },
    /// Set up Obsidian integration
    SetupObsidian {
        #[arg(long)]
        vault_path: Option<PathBuf>,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config_path = resolve_config_path(args.config);
    let load = || GulpConfig::load(&config_path);

    match args.command {
        Command::Start => start(&load()?).await,
        Command::Stats => show_stats(&load()?),
        Command::List { limit } => list_conversations(&load()?, limit),
        Command::Export { project } => export_conversations(&load()?, project.as_deref()),
        Command::SetupObsidian { vault_path, folder } => {
            // Saved back to disk, so environment overrides stay out of it
            let config = GulpConfig::load_file(&config_path)?;
            setup_obsidian(config, &config_path, vault_path, folder)
        }
    }
}

fn open_store(config: &GulpConfig) -> Result<ConversationStore> {
    let store = ConversationStore::open(&config.storage.db_path)?;
    info!("Database initialized at: {}", config.storage.db_path.display());
    Ok(store)
}

fn exporter(config: &GulpConfig) -> VaultExporter {
    VaultExporter::new(
        &config.obsidian.vault_path,
        &config.obsidian.ai_conversations_folder,
    )
    .with_full_conversation(config.obsidian.include_full_conversation)
}

async fn start(config: &GulpConfig) -> Result<()> {
    info!("GPT Gulp v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(Mutex::new(open_store(config)?));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (raw_tx, raw_rx) = mpsc::unbounded_channel();

    let ingestion = tokio::spawn(IngestionWorker::new(store.clone(), raw_rx).run());

    let mut collectors = Vec::new();
    if config.platform_enabled(VSCODE_PLATFORM) {
        let watch_paths = config
            .platforms
            .get(VSCODE_PLATFORM)
            .map(|p| p.watch_paths.clone())
            .unwrap_or_default();
        let collector = VsCodeCollector::new(watch_paths, raw_tx.clone());
        info!("Starting vscode collector...");
        collectors.push(tokio::spawn(collector.run(shutdown_rx.clone())));
    }
    for platform in BROWSER_PLATFORMS {
        if config.platform_enabled(platform) {
            warn!("No collector available for {}, skipping", platform);
        }
    }
    if collectors.is_empty() {
        warn!("No collectors enabled");
    }
    drop(raw_tx);

    let sync = SyncWorker::new(
        store,
        Arc::new(HeuristicEnricher::new()),
        exporter(config),
        config.sync.interval(),
    );
    let sync = tokio::spawn(sync.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received, stopping GPT Gulp...");
    let _ = shutdown_tx.send(true);

    for collector in collectors {
        match collector.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Collector failed: {}", e),
            Err(e) => error!("Collector task panicked: {}", e),
        }
    }
    // Collectors held the last senders, so the worker drains and exits
    let saved = ingestion.await.context("Ingestion worker panicked")?;
    sync.await.context("Sync worker panicked")?;

    info!("GPT Gulp stopped ({} conversations collected)", saved);
    Ok(())
}

fn show_stats(config: &GulpConfig) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.get_stats()?;

    println!("GPT Gulp Statistics");
    println!("{}", "=".repeat(40));
    println!("Total conversations: {}", stats.total);
    println!("Processed: {}", stats.processed);
    println!("Unprocessed: {}", stats.unprocessed);

    println!("\nBy Platform:");
    for (platform, count) in &stats.by_platform {
        println!("  {}: {}", platform, count);
    }

    println!("\nBy Project:");
    for (project, count) in &stats.by_project {
        let project = if project.is_empty() { "(unassigned)" } else { project.as_str() };
        println!("  {}: {}", project, count);
    }

    Ok(())
}

fn list_conversations(config: &GulpConfig, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let conversations = store.get_recent(limit)?;

    println!("Recent Conversations (Last {})", conversations.len());
    println!("{}", "=".repeat(60));

    for conversation in &conversations {
        let status = if conversation.processed { "[x]" } else { "[ ]" };
        let title: String = conversation.title.chars().take(LIST_TITLE_CHARS).collect();
        println!(
            "{} [{}] {} - {}...",
            status,
            conversation.timestamp.format_or_raw("%Y-%m-%d %H:%M"),
            conversation.platform,
            title
        );
        if !conversation.project.is_empty() && conversation.project != DEFAULT_PROJECT {
            println!("    Project: {}", conversation.project);
        }
        if !conversation.tags.is_empty() {
            let tags: Vec<&str> = conversation.tags.iter().take(3).map(String::as_str).collect();
            println!("    Tags: {}", tags.join(", "));
        }
        println!();
    }

    Ok(())
}

fn export_conversations(config: &GulpConfig, project: Option<&str>) -> Result<()> {
    let store = open_store(config)?;

    let conversations = match project {
        Some(project) => {
            let conversations = store.get_by_project(project)?;
            println!(
                "Exporting {} conversations for project '{}'...",
                conversations.len(),
                project
            );
            conversations
        }
        None => {
            let conversations = store.get_recent(EXPORT_RECENT_LIMIT)?;
            println!("Exporting {} recent conversations...", conversations.len());
            conversations
        }
    };

    let summary = exporter(config).export_all(&conversations);
    println!(
        "Export complete: {} written, {} skipped, {} failed",
        summary.written, summary.skipped, summary.failed
    );
    Ok(())
}

fn setup_obsidian(
    mut config: GulpConfig,
    config_path: &Path,
    vault_path: Option<PathBuf>,
    folder: Option<String>,
) -> Result<()> {
    if let Some(vault_path) = vault_path {
        config.obsidian.vault_path = vault_path;
    }
    if let Some(folder) = folder.filter(|f| !f.trim().is_empty()) {
        config.obsidian.ai_conversations_folder = folder;
    }

    config.save(config_path)?;
    println!("Obsidian configuration updated!");

    if config.obsidian.vault_path.exists() {
        let folder = config.conversations_folder();
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create {}", folder.display()))?;
        println!("Created folder: {}", folder.display());
    } else {
        warn!(
            "Obsidian vault not found: {}",
            config.obsidian.vault_path.display()
        );
    }

    Ok(())
}
