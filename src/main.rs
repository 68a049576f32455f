use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geodist::catalog::{CatalogBuilder, CatalogCache, HttpListingSource};
use geodist::config::Config;
use geodist::pool::SettingsStore;
use geodist::server::DistributionServer;

#[derive(Parser)]
#[command(
    name = "geodist",
    version,
    about = "Map data download distribution server with mirror routing",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file; environment variables are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the distribution server
    Serve {
        /// Bind address (e.g. 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,

        /// Root of the downloadable files tree
        #[arg(long)]
        files_root: Option<PathBuf>,

        /// Download settings JSON
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Build the catalog once and print or write its descriptor
    Catalog {
        /// Root of the downloadable files tree
        #[arg(long)]
        files_root: Option<PathBuf>,

        /// Directory receiving indexes.json and indexes.json.gz
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show mirror shares per specialty
    Weights {
        /// Download settings JSON
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!("geodist starting");

    match cli.command {
        Commands::Serve {
            bind,
            files_root,
            settings,
        } => {
            if let Some(bind) = bind {
                config.server.bind_address = bind;
            }
            if let Some(root) = files_root {
                config.catalog.files_root = root;
            }
            if settings.is_some() {
                config.mirrors.settings_path = settings;
            }
            tracing::info!(
                bind = %config.server.bind_address,
                files_root = %config.catalog.files_root.display(),
                settings = ?config.mirrors.settings_path,
                "Starting serve command"
            );
            serve(config).await?;
        }

        Commands::Catalog { files_root, output } => {
            if let Some(root) = files_root {
                config.catalog.files_root = root;
            }
            tracing::info!(
                files_root = %config.catalog.files_root.display(),
                output = ?output,
                "Starting catalog command"
            );
            catalog(config, output).await?;
        }

        Commands::Weights { settings } => {
            let path = settings
                .or(config.mirrors.settings_path)
                .context("No settings file given (use --settings or GEODIST_SETTINGS)")?;
            tracing::info!(settings = %path.display(), "Starting weights command");
            weights(path)?;
        }
    }

    tracing::info!("geodist completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("geodist=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("geodist={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    if let Err(e) = geodist::metrics::init_metrics() {
        tracing::warn!("Metrics initialization failed: {e}");
    }

    let server = DistributionServer::new(config.server_config()?)
        .context("Failed to create distribution server")?;

    println!("{}", server.info().display());

    server
        .start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {e}");
                return;
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Distribution server failed")?;

    Ok(())
}

async fn catalog(config: Config, output: Option<PathBuf>) -> Result<()> {
    let listing = HttpListingSource::with_scheme(
        config.catalog.listing_scheme.clone(),
        Duration::from_secs(config.catalog.listing_timeout_secs),
    )?;

    let mut cache = CatalogCache::new(CatalogBuilder::new(&config.catalog.files_root, Arc::new(listing)));
    let print = output.is_none();
    if let Some(dir) = output.or(config.catalog.gen_dir) {
        cache = cache.with_output_dir(dir);
    }

    let snapshot = cache.refresh().await.context("Catalog generation failed")?;

    if print {
        println!("{}", String::from_utf8_lossy(&snapshot.descriptor));
    } else {
        println!("{}", cache.status().await.display());
    }

    Ok(())
}

fn weights(path: PathBuf) -> Result<()> {
    let store = SettingsStore::load(&path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;
    let snapshot = store.snapshot();

    println!("Mirror weights ({})", path.display());
    println!("{:-<40}", "");
    println!("Main load: {}%", snapshot.settings.main_load);
    println!("Help servers: {}", snapshot.settings.help_servers.join(", "));
    println!("Main servers: {}", snapshot.settings.main_servers.join(", "));

    for (specialty, shares) in snapshot.pool.percentages() {
        println!();
        println!("{specialty}");
        for (mirror, percent) in shares {
            println!("  {mirror:<32} {percent:>3}%");
        }
    }

    Ok(())
}
