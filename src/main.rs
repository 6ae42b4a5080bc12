//! Slotdeck - plugin host for terminal dashboards.
//!
//! Installs plugins from the built-in catalog, edits their settings and
//! renders them into named slots.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::generate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slotdeck::app::Outcome;
use slotdeck::plugin::{catalog, PluginCategory, SlotView};
use slotdeck::{Config, Shell};

/// Plugin host for terminal dashboards
#[derive(Parser)]
#[command(name = "slotdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the plugins available to install
    Catalog {
        /// Only show entries whose id, name or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only show entries in this category (widget, productivity, health, other)
        #[arg(long)]
        category: Option<PluginCategory>,
    },

    /// List installed plugins
    List {
        /// Only show enabled plugins
        #[arg(short, long)]
        enabled: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Install a plugin from the catalog
    Install {
        /// Plugin id
        id: String,
    },

    /// Uninstall a plugin (its settings are kept)
    Uninstall {
        /// Plugin id
        id: String,
    },

    /// Enable an installed plugin
    Enable {
        /// Plugin id
        id: String,
    },

    /// Disable a plugin
    Disable {
        /// Plugin id
        id: String,
    },

    /// Show or change plugin settings
    Settings {
        /// Settings operation
        #[command(subcommand)]
        operation: SettingsOperation,
    },

    /// Render the plugins in a slot
    Render {
        /// Slot name
        slot: String,

        /// Text to show when no plugin targets the slot
        #[arg(long)]
        fallback: Option<String>,

        /// How long to wait for plugins that are still loading
        #[arg(long)]
        wait_ms: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum SettingsOperation {
    /// Show a plugin's settings
    Show {
        /// Plugin id
        id: String,
    },

    /// Set a single value
    Set {
        /// Plugin id
        id: String,
        /// Dotted field key
        key: String,
        /// New value
        value: String,
    },

    /// Reset every value to its default
    Reset {
        /// Plugin id
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("warn") };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let config = Config::load_or_default(cli.config.as_deref())?;
    let shell = Shell::start(config).await?;

    let result = run(&shell, cli.command).await;
    shell.shutdown().await;
    result
}

async fn run(shell: &Shell, command: Commands) -> Result<()> {
    match command {
        Commands::Catalog { search, category } => cmd_catalog(shell, search.as_deref(), category),
        Commands::List { enabled, format } => cmd_list(shell, enabled, format)?,
        Commands::Install { id } => {
            let outcome = shell.install(&id)?;
            report(&id, outcome, "installed")?;
        }
        Commands::Uninstall { id } => report(&id, shell.uninstall(&id), "uninstalled")?,
        Commands::Enable { id } => report(&id, shell.enable(&id), "enabled")?,
        Commands::Disable { id } => report(&id, shell.disable(&id), "disabled")?,
        Commands::Settings { operation } => cmd_settings(shell, operation)?,
        Commands::Render { slot, fallback, wait_ms } => {
            cmd_render(shell, &slot, fallback, wait_ms).await;
        }
        Commands::Completions { shell: target } => cmd_completions(target),
    }

    Ok(())
}

fn report(id: &str, outcome: Outcome, verb: &str) -> Result<()> {
    match outcome {
        Outcome::Changed => println!("{id} {verb}"),
        Outcome::Unchanged => println!("{id} already {verb}"),
        Outcome::NotInstalled => anyhow::bail!("Plugin '{id}' is not installed"),
    }
    Ok(())
}

/// Print matching catalog entries with each entry's registry status.
fn cmd_catalog(shell: &Shell, search: Option<&str>, category: Option<PluginCategory>) {
    let mut entries = match (search, category) {
        (Some(query), _) => catalog::search(query),
        (None, Some(category)) => catalog::by_category(category),
        (None, None) => catalog::catalog().iter().collect(),
    };
    if let (Some(_), Some(category)) = (search, category) {
        entries.retain(|entry| entry.category == category);
    }

    for entry in &entries {
        let status = shell.registry().get(&entry.id).map_or("available", |p| p.status());
        println!(
            "{} {:<14} {:<12} [{}] - {}",
            entry.icon, entry.id, status, entry.category, entry.description
        );
    }
    println!("\nTotal: {} plugins", entries.len());
}

fn cmd_list(shell: &Shell, enabled_only: bool, format: Format) -> Result<()> {
    let plugins = shell.plugins(enabled_only);

    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&plugins)?;
            println!("{json}");
        }
        Format::Text => {
            for plugin in &plugins {
                println!(
                    "{} {:<14} {:<9} slots: {}",
                    plugin.icon,
                    plugin.id,
                    plugin.status(),
                    plugin.slots().join(", ")
                );
            }
            println!("\nTotal: {} plugins", plugins.len());
        }
    }

    Ok(())
}

fn cmd_settings(shell: &Shell, operation: SettingsOperation) -> Result<()> {
    match operation {
        SettingsOperation::Show { id } => {
            let form = shell
                .settings_form(&id)
                .ok_or_else(|| anyhow::anyhow!("Plugin '{id}' is not installed"))?;
            print!("{form}");
        }
        SettingsOperation::Set { id, key, value } => {
            if shell.set_setting(&id, &key, &value)? {
                println!("{id}: {key} updated");
            } else {
                println!("{id}: {key} unchanged");
            }
        }
        SettingsOperation::Reset { id } => match shell.reset_settings(&id) {
            Outcome::Changed => println!("{id}: settings reset to defaults"),
            Outcome::Unchanged => println!("{id}: settings already at defaults"),
            Outcome::NotInstalled => anyhow::bail!("Plugin '{id}' is not installed"),
        },
    }

    Ok(())
}

async fn cmd_render(shell: &Shell, slot: &str, fallback: Option<String>, wait_ms: Option<u64>) {
    let wait = wait_ms.map_or_else(|| shell.config().render_wait(), Duration::from_millis);

    let mut host = shell.slot(slot);
    if let Some(text) = fallback {
        host = host.with_fallback(text);
    }

    match host.settle(wait).await {
        SlotView::Empty => println!("Slot '{slot}' is empty"),
        view => print!("{view}"),
    }
}

fn cmd_completions(shell: clap_complete::Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "slotdeck", &mut io::stdout());
}
