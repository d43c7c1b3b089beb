//! Quote Sync - store, filter, and sync short quotes.
//!
//! Quotes live in a local `SQLite` key/value store and can be filtered by
//! category, exported/imported as JSON, and synchronized with a remote
//! endpoint where the server's snapshot always wins.
//!
//! QUICK START:
//!   quotes random                        # Random quote from the last category
//!   quotes list -c Programming -f table  # Table of one category
//!   quotes add "Stay curious." Life      # Add (and post to the server)
//!   quotes export -o quotes.json         # Save all quotes
//!   quotes watch                         # Sync every 30s until Ctrl-C

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    export_to_file, format_categories, format_import_report, format_quote, format_quotes,
    format_sync_outcome, format_sync_state, import_from_file, OutputFormat, QuoteStore,
    StoreEvent, SyncService,
};
use cli::{Cli, Commands};
use domain::{AppConfig, AppError, CategoryFilter};
use infrastructure::{ensure_config_exists, load_config, save_config, HttpTransport, LocalStorage};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;

    let data_dir = cli.data_dir.as_deref();
    let config = load_config(data_dir)?;

    match cli.command {
        Commands::Show { category } => {
            cmd_show(&config, category.as_deref())?;
        }
        Commands::Random { category } => {
            cmd_random(&config, category.as_deref())?;
        }
        Commands::List { category } => {
            cmd_list(&config, category.as_deref(), format)?;
        }
        Commands::Categories => {
            cmd_categories(&config)?;
        }
        Commands::Add {
            text,
            category,
            no_push,
        } => {
            cmd_add(config, &text, &category, no_push).await?;
        }
        Commands::Export { output } => {
            cmd_export(&config, &output)?;
        }
        Commands::Import { file } => {
            cmd_import(&config, &file)?;
        }
        Commands::Sync => {
            cmd_sync(config).await?;
        }
        Commands::Watch { interval } => {
            cmd_watch(config, interval).await?;
        }
        Commands::Status => {
            cmd_status(&config)?;
        }
        Commands::Config {
            init,
            interval,
            endpoint,
        } => {
            cmd_config(config, data_dir, init, interval, endpoint)?;
        }
        Commands::Paths => {
            cmd_paths(&config)?;
        }
    }

    Ok(())
}

/// Open the persistent quote store.
fn open_store(config: &AppConfig) -> domain::Result<QuoteStore<LocalStorage>> {
    let storage = LocalStorage::open(&config.storage_db_path())?;
    QuoteStore::initialize(storage)
}

/// Build a sync service around the persistent store.
fn open_service(config: &AppConfig) -> domain::Result<SyncService<LocalStorage>> {
    let store = open_store(config)?;
    let transport = Arc::new(HttpTransport::new(&config.sync)?);
    Ok(SyncService::new(store, transport, config.sync.clone()))
}

/// Resolve the category filter: an explicit one is remembered, otherwise
/// the last remembered one applies.
fn select_filter(
    store: &mut QuoteStore<LocalStorage>,
    category: Option<&str>,
) -> domain::Result<CategoryFilter> {
    match category {
        Some(c) => {
            let filter = CategoryFilter::from_option(Some(c));
            store.set_filter(&filter)?;
            Ok(filter)
        }
        None => store.current_filter(),
    }
}

/// Show the first quote in scope.
fn cmd_show(config: &AppConfig, category: Option<&str>) -> domain::Result<()> {
    let mut store = open_store(config)?;
    let filter = select_filter(&mut store, category)?;

    match store.first_in_scope(&filter) {
        Some(quote) => println!("{}", format_quote(quote)),
        None => println!("No quotes found."),
    }

    Ok(())
}

/// Show a random quote in scope.
fn cmd_random(config: &AppConfig, category: Option<&str>) -> domain::Result<()> {
    let mut store = open_store(config)?;
    let filter = select_filter(&mut store, category)?;

    match store.show_random(&filter)? {
        Some(quote) => println!("{}", format_quote(&quote)),
        None => println!("No quotes available in category '{filter}'."),
    }

    Ok(())
}

/// List quotes in scope.
fn cmd_list(config: &AppConfig, category: Option<&str>, format: OutputFormat) -> domain::Result<()> {
    let mut store = open_store(config)?;
    let filter = select_filter(&mut store, category)?;
    let quotes = store.filtered(&filter);

    if quotes.is_empty() {
        println!("No quotes found.");
        return Ok(());
    }

    let output = format_quotes(&quotes, format).map_err(AppError::json_parse)?;
    println!("{output}");

    if matches!(format, OutputFormat::Text | OutputFormat::Table) {
        println!();
        println!("{} quote(s) in '{}'", quotes.len(), filter);
    }

    Ok(())
}

/// List categories.
fn cmd_categories(config: &AppConfig) -> domain::Result<()> {
    let store = open_store(config)?;
    let active = store.current_filter()?;

    println!("{}", format_categories(&store.all_categories(), &active));

    Ok(())
}

/// Add a quote and replicate it.
async fn cmd_add(
    mut config: AppConfig,
    text: &str,
    category: &str,
    no_push: bool,
) -> domain::Result<()> {
    config.sync.push_on_add = config.sync.push_on_add && !no_push;

    let service = open_service(&config)?;
    let (quote, replication) = service.add_quote(text, category).await?;

    println!(
        "{} Added quote to '{}'",
        "✓".green().bold(),
        quote.category.cyan()
    );

    // The process is about to exit; let the background post finish.
    if let Some(handle) = replication {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Replication task failed");
        }
    }

    Ok(())
}

/// Export quotes to a JSON file.
fn cmd_export(config: &AppConfig, output: &Path) -> domain::Result<()> {
    let store = open_store(config)?;
    let count = export_to_file(&store, output)?;

    println!(
        "{} Exported {} quote(s) to {}",
        "✓".green().bold(),
        count,
        output.display()
    );

    Ok(())
}

/// Import quotes from a JSON file.
fn cmd_import(config: &AppConfig, file: &Path) -> domain::Result<()> {
    let mut store = open_store(config)?;
    let report = import_from_file(&mut store, file)?;

    println!("{}", format_import_report(&report));

    Ok(())
}

/// Run a single sync cycle.
async fn cmd_sync(config: AppConfig) -> domain::Result<()> {
    let service = open_service(&config)?;
    let outcome = service.sync_once().await?;

    println!("{}", format_sync_outcome(&outcome));

    Ok(())
}

/// Poll the server until Ctrl-C.
async fn cmd_watch(config: AppConfig, interval: Option<u64>) -> domain::Result<()> {
    if !config.sync.enabled {
        return Err(AppError::Config {
            message: "Sync is disabled in configuration (sync.enabled = false)".into(),
        });
    }

    let interval = interval.map_or_else(
        || config.sync.interval(),
        |secs| std::time::Duration::from_secs(secs.max(1)),
    );

    let service = open_service(&config)?;
    let mut events = service.subscribe().await;
    let poller = service.spawn_poller(interval);

    println!(
        "🔄 Syncing with {} every {}s (Ctrl-C to stop)",
        config.sync.endpoint.cyan(),
        interval.as_secs()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::Notice(notice)) => {
                    println!("{} {}", "⟳".yellow().bold(), notice.message);

                    let store = service.store();
                    let mut store = store.lock().await;
                    let filter = store.current_filter()?;
                    if let Some(quote) = store.show_random(&filter)? {
                        println!("{}", format_quote(&quote));
                    }
                }
                Ok(StoreEvent::CollectionChanged { len }) => {
                    tracing::debug!(len, "Collection changed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed store events");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    poller.stop().await;

    let state = service.state().await?;
    let store = service.store();
    let store = store.lock().await;
    if let Some(quote) = store.last_viewed() {
        println!("Last viewed: {}", format_quote(&quote));
    }
    println!("{}", format_sync_state(&state, store.len()));

    Ok(())
}

/// Show sync status.
fn cmd_status(config: &AppConfig) -> domain::Result<()> {
    let store = open_store(config)?;
    let state = store.sync_state()?;

    println!("{}", format_sync_state(&state, store.len()));

    Ok(())
}

/// Show or update configuration.
fn cmd_config(
    mut config: AppConfig,
    data_dir: Option<&Path>,
    init: bool,
    interval: Option<u64>,
    endpoint: Option<String>,
) -> domain::Result<()> {
    if init {
        let path = ensure_config_exists(data_dir)?;
        println!("{} Config file: {}", "✓".green().bold(), path.display());
        config = load_config(data_dir)?;
    }

    if interval.is_some() || endpoint.is_some() {
        if let Some(secs) = interval {
            config.sync.interval_secs = secs;
        }
        if let Some(url) = endpoint {
            config.sync.endpoint = url;
        }
        save_config(&config)?;
    }

    let rendered = toml::to_string_pretty(&config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;
    println!("{rendered}");

    Ok(())
}

/// Show paths command.
fn cmd_paths(config: &AppConfig) -> domain::Result<()> {
    let db_path = config.storage_db_path();

    println!("{}", "📂 Quote Sync Paths".bold());
    println!();
    println!("  Data dir: {}", config.data_dir().display());
    println!("  Config:   {}", config.config_file_path().display());
    println!("  Database: {}", db_path.display());

    if db_path.exists() {
        let storage = LocalStorage::open(&db_path)?;
        println!();
        println!("  Size: {} bytes", storage.get_storage_size()?);
        println!("  Keys: {}", storage.keys()?.join(", "));
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
