//! Sensor Map API CLI
//!
//! Serves the floor-plan sensor dataset over HTTP.

use chrono::Utc;
use clap::{Parser, Subcommand};
use sensor_map_api::{
    config::Config, Dataset, FeedbackResolver, MemoryStore, ResolveError, VERSION,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "server")]
use sensor_map_api::server::{self, ServerConfig};
#[cfg(feature = "server")]
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sensor-map")]
#[command(version = VERSION)]
#[command(about = "Read-mostly HTTP API for floor-plan sensors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to listen on (overrides the config file)
        #[arg(long)]
        port: Option<u16>,

        /// Dataset file to serve (overrides the config file)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Resolve the current hot/cold feedback once and print it as JSON
    Feedback {
        /// Trailing window in minutes (default 15)
        #[arg(long)]
        window: Option<String>,

        /// Dataset file to read (overrides the config file)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Write a small sample dataset
    Seed {
        /// Output file (defaults to the configured dataset path)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        write: bool,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, dataset } => {
            cmd_serve(port, dataset);
        }
        Commands::Feedback { window, dataset } => {
            cmd_feedback(window, dataset);
        }
        Commands::Seed { output, force } => {
            cmd_seed(output, force);
        }
        Commands::Config { write } => {
            cmd_config(write);
        }
    }
}

/// Log to stderr so command output on stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config, using defaults: {e}");
        Config::default()
    })
}

fn open_store(path: &Path) -> MemoryStore {
    match MemoryStore::open(path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening dataset {path:?}: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "server")]
fn cmd_serve(port: Option<u16>, dataset: Option<PathBuf>) {
    let mut config = load_config();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dataset) = dataset {
        config.dataset_path = dataset;
    }

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Sensor Map API v{VERSION}");
    println!("  Dataset: {:?}", config.dataset_path);

    let store = Arc::new(open_store(&config.dataset_path));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let (addr, shutdown_tx) = match server::run(ServerConfig::from_config(&config), store).await
        {
            Ok(handle) => handle,
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        };

        println!("  Listening on http://{addr}");
        println!();
        println!("Press Ctrl+C to stop");

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        ctrlc_handler(stop_tx);

        let _ = stop_rx.await;
        println!();
        println!("Stopping...");
        let _ = shutdown_tx.send(());
    });
}

#[cfg(not(feature = "server"))]
fn cmd_serve(_port: Option<u16>, _dataset: Option<PathBuf>) {
    eprintln!("Error: serve requires the server feature (rebuild with --features server)");
    std::process::exit(1);
}

fn cmd_feedback(window: Option<String>, dataset: Option<PathBuf>) {
    let config = load_config();
    let store = open_store(&dataset.unwrap_or(config.dataset_path));

    match FeedbackResolver::new(&store).resolve(window.as_deref()) {
        Ok(result) => println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| "Error".to_string())
        ),
        Err(e) => {
            let body = serde_json::json!({
                "error": { "code": e.code(), "message": e.to_string() }
            });
            eprintln!("{body}");
            let exit_code = match e {
                ResolveError::InvalidWindow => 2,
                ResolveError::Store(_) => 1,
            };
            std::process::exit(exit_code);
        }
    }
}

fn cmd_seed(output: Option<PathBuf>, force: bool) {
    let config = load_config();
    let output = output.unwrap_or(config.dataset_path);

    if output.exists() && !force {
        eprintln!("Error: {output:?} already exists (use --force to overwrite)");
        std::process::exit(1);
    }

    let store = MemoryStore::from_dataset(Dataset::sample(Utc::now())).with_persist_path(&output);
    match store.save() {
        Ok(()) => println!("Wrote sample dataset to {output:?}"),
        Err(e) => {
            eprintln!("Error writing dataset: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_config(write: bool) {
    let config = load_config();

    if write {
        if let Err(e) = config.save() {
            eprintln!("Error saving config: {e}");
            std::process::exit(1);
        }
        println!("Saved configuration to {:?}", Config::config_path());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
#[cfg(feature = "server")]
fn ctrlc_handler(stop: tokio::sync::oneshot::Sender<()>) {
    let mut stop = Some(stop);
    if let Err(e) = ctrlc::set_handler(move || {
        if let Some(stop) = stop.take() {
            let _ = stop.send(());
        }
    }) {
        eprintln!("Error setting Ctrl+C handler: {e}");
        std::process::exit(1);
    }
}
