//! Folio CLI
//!
//! Command-line interface for Folio - edit, draft and commit blog content.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_core::{Category, Config};

mod commands;
mod interact;
mod output;

use commands::{EditArgs, Workspace};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio - draft, diff and commit blog content")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Answer yes to confirmations (including overwriting newer remote content)
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the items of a category
    #[command(alias = "ls")]
    List {
        /// articles, records or knowledges
        category: Category,
    },
    /// Show an item and its body
    Show { category: Category, id: u64 },
    /// Create an item and commit it
    #[command(alias = "add")]
    New {
        category: Category,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Edit an item and commit the changes
    Edit {
        category: Category,
        id: u64,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Delete items and their bodies
    #[command(alias = "rm")]
    Delete {
        category: Category,
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Manage local drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Show the commit backend's current head
    Head,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (content root, counts, backend)
    Status,
}

#[derive(Subcommand)]
enum DraftCommands {
    /// Save edits as a draft (omit the ID for a new item)
    Save {
        category: Category,
        id: Option<u64>,
        #[command(flatten)]
        edit: EditArgs,
    },
    /// Show an item with its draft applied
    Load { category: Category, id: Option<u64> },
    /// Discard a draft
    Clear { category: Category, id: Option<u64> },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (content_root, backend, relay_url, ...)
        key: String,
        /// Configuration value ("none" clears optional values)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let yes = cli.yes;

    let workspace = || -> Result<Workspace> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Workspace::new(config))
    };

    match cli.command {
        Commands::List { category } => commands::content::list(&workspace()?, category, &output),
        Commands::Show { category, id } => {
            commands::content::show(&workspace()?, category, id, &output)
        }
        Commands::New { category, edit } => {
            commands::edit::create(&workspace()?, category, edit, yes, &output).await
        }
        Commands::Edit { category, id, edit } => {
            commands::edit::edit(&workspace()?, category, id, edit, yes, &output).await
        }
        Commands::Delete { category, ids } => {
            commands::delete::delete(&workspace()?, category, ids, yes, &output).await
        }
        Commands::Draft { command } => handle_draft_command(command, &workspace()?, &output),
        Commands::Head => commands::head::show(&workspace()?, &output).await,
        Commands::Config { command } => handle_config_command(command, &output),
        Commands::Status => commands::status::show(&workspace()?, &output),
    }
}

fn handle_draft_command(command: DraftCommands, ws: &Workspace, output: &Output) -> Result<()> {
    match command {
        DraftCommands::Save { category, id, edit } => {
            commands::draft::save(ws, category, id, edit, output)
        }
        DraftCommands::Load { category, id } => commands::draft::load(ws, category, id, output),
        DraftCommands::Clear { category, id } => commands::draft::clear(ws, category, id, output),
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Log to stderr; level from FOLIO_LOG (default warn)
fn init_logging() {
    let log_level = std::env::var("FOLIO_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!("folio_core={},folio_cli={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
