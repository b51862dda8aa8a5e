//! sitecheck CLI: run URL-scoped browser tests from a `.sitecheck/` project.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, WrapErr};
use colored::Colorize;
use sc_core::config::loader::load_config;
use sc_core::factory;
use sc_core::init::{generate_project_structure, InitOptions};
use sc_core::resolver;
use sc_core::state::RunRequest;
use sc_protocol::{Event, TestKind};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

mod output;

#[derive(Parser)]
#[command(name = "sitecheck")]
#[command(author, version, about = "URL-scoped browser test orchestration", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project root containing `.sitecheck/`
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a `.sitecheck/` directory with sample files
    Init {
        /// Overwrite an existing `.sitecheck/` directory
        #[arg(long)]
        force: bool,

        /// Only write config.toml and one sample configuration
        #[arg(long)]
        minimal: bool,
    },

    /// List loaded test configurations
    Configs,

    /// Show which configuration would run for a URL
    Resolve {
        url: String,

        /// deterministic or goal_directed (traditional / agentic accepted)
        #[arg(long)]
        kind: Option<TestKind>,
    },

    /// Run the test configured for a URL
    Run {
        url: String,

        #[arg(long)]
        kind: Option<TestKind>,

        /// Use this session id instead of a generated one
        #[arg(long)]
        session_id: Option<String>,

        /// JSON instructions to run instead of a stored configuration (needs --kind)
        #[arg(long)]
        instructions: Option<PathBuf>,

        /// Run against an in-memory blank browser
        #[arg(long)]
        dry_run: bool,

        /// Print the full execution result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a stored session
    Session { id: String },

    /// Show the action log of a session
    Logs {
        id: String,

        /// Print entries as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Mark a running session as cancelled
    Cancel { id: String },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { force, minimal } => {
            generate_project_structure(InitOptions {
                target_dir: cli.root.clone(),
                force,
                minimal,
            })
            .await?;
            println!(
                "{} Initialized {}",
                "✓".green(),
                cli.root.join(".sitecheck").display()
            );
        }
        Commands::Configs => {
            let config = load_config(&cli.root).await?;
            if config.configurations.is_empty() {
                println!("No configurations found. Run `sitecheck init` to create samples.");
            }
            for configuration in &config.configurations {
                println!("{}", output::configuration(configuration));
            }
        }
        Commands::Resolve { url, kind } => {
            let config = load_config(&cli.root).await?;
            match resolver::resolve(&config.configurations, &url, kind) {
                Some(configuration) => println!("{}", output::configuration(configuration)),
                None => bail!("No active configuration matches {url}"),
            }
        }
        Commands::Run {
            url,
            kind,
            session_id,
            instructions,
            dry_run,
            json,
        } => {
            let mut request = RunRequest::new(url);
            if let Some(id) = session_id {
                request = request.with_session_id(id);
            }
            request = match (instructions, kind) {
                (Some(path), Some(kind)) => request.with_inline(kind, read_instructions(&path)?),
                (Some(_), None) => bail!("--instructions needs --kind"),
                (None, Some(kind)) => request.with_kind(kind),
                (None, None) => request,
            };
            let success = run(&cli.root, request, dry_run, json).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Session { id } => {
            let manager = open_manager(&cli.root).await?;
            let session = manager.get_session(&id).await?;
            println!("{}", output::session(&session));
        }
        Commands::Logs { id, json } => {
            let manager = open_manager(&cli.root).await?;
            let entries = manager.get_action_logs(&id).await?;
            for entry in &entries {
                if json {
                    println!("{}", serde_json::to_string(entry)?);
                } else {
                    println!("{}", output::log_entry(entry));
                }
            }
        }
        Commands::Cancel { id } => {
            let manager = open_manager(&cli.root).await?;
            let session = manager.cancel_session(&id).await?;
            println!("{} {}", session.id.bold(), output::status(session.status));
        }
    }

    Ok(())
}

/// Runs one test while printing its events; returns whether it passed.
async fn run(root: &Path, request: RunRequest, dry_run: bool, json: bool) -> color_eyre::Result<bool> {
    let config = load_config(root).await?;
    let (tx, mut rx) = mpsc::channel::<Event>(256);
    let manager = factory::build_manager(root, &config, dry_run, tx)
        .await
        .map_err(|e| eyre!("{e:#}"))?;

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if !json {
                println!("{}", output::event(&event));
            }
        }
    });

    let result = manager.run_test(request).await;
    drop(manager);
    printer.await?;
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(summary) = &result.error_summary {
        println!("{}", summary.red());
    }
    Ok(result.success)
}

/// A manager for inspecting stored sessions; no browser is opened.
async fn open_manager(root: &Path) -> color_eyre::Result<sc_core::state::SessionManager> {
    let config = load_config(root).await?;
    let (tx, mut rx) = mpsc::channel::<Event>(16);
    tokio::spawn(async move { while rx.recv().await.is_some() {} });
    factory::build_manager(root, &config, true, tx)
        .await
        .map_err(|e| eyre!("{e:#}"))
}

fn read_instructions(path: &Path) -> color_eyre::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}
