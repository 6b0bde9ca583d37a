//! schema-snapshot CLI - SQL schema snapshots of a cache cluster.

use clap::{Parser, Subcommand};
use schema_snapshot::client::DEFAULT_USER;
use schema_snapshot::{
    ClusterSession, Config, EmbeddedConfig, EmbeddedInstance, SeedFile, SnapshotError,
    SnapshotOrchestrator, SnapshotReport, SnapshotRequest, ThinClient,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "schema-snapshot")]
#[command(about = "SQL schema snapshots of a cache cluster")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a schema snapshot of the cluster
    #[command(visible_alias = "ss")]
    Snapshot {
        /// Cluster address (host:port), may be repeated
        #[arg(short, long = "address")]
        addresses: Vec<String>,

        /// Override snapshot directory
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Override snapshot base name
        #[arg(long)]
        name: Option<String>,

        /// Replace unsupported column types with OBJECT instead of skipping the cache
        #[arg(long = "unsafe-type", visible_alias = "ut")]
        unsafe_type: bool,

        /// Snapshot every cache (default unless --cache is given)
        #[arg(long)]
        full: bool,

        /// Snapshot only this cache, may be repeated
        #[arg(long = "cache")]
        caches: Vec<String>,

        /// Snapshot a local instance seeded from this YAML file
        #[arg(long, value_name = "SEED")]
        playground: Option<PathBuf>,

        /// Raw snapshot flags after `--`: -ut, -full, -snapshot.name=NAME, -snapshot.dir=DIR
        #[arg(last = true)]
        raw: Vec<String>,
    },

    /// Run a local single-node instance until interrupted
    Serve {
        /// Bind host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port (0 picks a free port)
        #[arg(long, default_value = "10800")]
        port: u16,

        /// Create the caches of this YAML file on startup
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), SnapshotError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| SnapshotError::Config(e.to_string()))?;

    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    match cli.command {
        Commands::Snapshot {
            addresses,
            dir,
            name,
            unsafe_type,
            full,
            caches,
            playground,
            raw,
        } => {
            if playground.is_some() && !addresses.is_empty() {
                return Err(SnapshotError::Config(
                    "--address cannot be combined with --playground".into(),
                ));
            }

            // Apply overrides
            if !addresses.is_empty() {
                config.cluster.addresses = addresses;
            }
            if let Some(dir) = dir {
                config.snapshot.dir = dir;
            }
            if let Some(name) = name {
                config.snapshot.name = name;
            }
            if unsafe_type {
                config.snapshot.unknown_type_support = true;
            }
            if !caches.is_empty() {
                config.snapshot.caches = caches;
                config.snapshot.full = false;
            }
            if full {
                config.snapshot.full = true;
            }
            config.snapshot.apply_args(raw.as_slice())?;
            config.validate()?;

            let report = match playground {
                Some(seed) => snapshot_playground(&config, &seed).await?,
                None => snapshot_cluster(&config).await?,
            };

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Serve { host, port, seed } => {
            let instance = EmbeddedInstance::start(&EmbeddedConfig { host, port }).await?;

            if let Some(seed) = seed {
                let seed = SeedFile::load(&seed)?;
                for cache in seed.caches {
                    instance.create_cache(cache).await?;
                }
            }

            println!("Listening on {}", instance.address());

            let cancel_token = setup_signal_handler().await?;
            cancel_token.cancelled().await;

            instance.close();
        }
    }

    Ok(())
}

async fn snapshot_cluster(config: &Config) -> Result<SnapshotReport, SnapshotError> {
    if config.cluster.addresses.is_empty() {
        return Err(SnapshotError::Config(
            "no cluster address: use --address, cluster.addresses or --playground".into(),
        ));
    }

    let client = ThinClient::connect(&config.cluster.client_config()).await?;
    let result = SnapshotOrchestrator::from_options(&config.snapshot)
        .run(&client, &SnapshotRequest::from_options(&config.snapshot))
        .await;
    client.close().await;

    result
}

async fn snapshot_playground(config: &Config, seed: &Path) -> Result<SnapshotReport, SnapshotError> {
    let seed = SeedFile::load(seed)?;
    if !config.cluster.addresses.is_empty() {
        warn!(
            "Configured cluster addresses are ignored for a playground snapshot [addresses={:?}]",
            config.cluster.addresses
        );
    }
    let user = config
        .cluster
        .user
        .clone()
        .unwrap_or_else(|| DEFAULT_USER.to_string());

    let mut session = ClusterSession::new(EmbeddedConfig::default()).with_user(user);

    let result = async {
        session.seed(&seed.caches).await?;
        let client = session.open().await?;
        SnapshotOrchestrator::from_options(&config.snapshot)
            .run(client.as_ref(), &SnapshotRequest::from_options(&config.snapshot))
            .await
    }
    .await;

    session.close().await;
    result
}

fn print_report(report: &SnapshotReport) {
    println!("Snapshot written: {}", report.path.display());
    println!("  Dumped caches:  {}", report.dumped_caches.len());
    println!("  Skipped caches: {}", report.skipped_caches.len());
    for skipped in &report.skipped_caches {
        println!("    - {}: {}", skipped.cache_name, skipped.reason);
    }
    for warning in &report.warnings {
        println!(
            "  Warning: {}.{} ({}) was written as OBJECT",
            warning.table, warning.column, warning.class_name
        );
    }
    println!("  SHA-256: {}", report.sha256);
    println!("  Duration: {:.2}s", report.duration_seconds());
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, SnapshotError> {
    let cancel_token = CancellationToken::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Shutting down..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Shutting down..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, SnapshotError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        eprintln!("\nReceived Ctrl-C. Shutting down...");
        token.cancel();
    });

    Ok(cancel_token)
}
