//! ContactLink - Contact identity resolution service
//!
//! Links contact records that share an email or phone number into a single
//! identity and serves the resolved view over HTTP.

use anyhow::Result;
use clap::{Parser, Subcommand};
use contactlink::{
    api::build_app,
    config::ContactLinkConfig,
    contacts::{
        types::IdentifyResponse, ContactStore, IdentityResolver, MemoryContactStore, Observation,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "contactlink")]
#[command(author = "A3S Lab Team")]
#[command(version)]
#[command(about = "Contact identity resolution service")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONTACTLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Resolve a single observation and print the cluster view
    Identify {
        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("contactlink={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => ContactLinkConfig::load(path)?,
        None => ContactLinkConfig::default(),
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Identify { email, phone } => {
            run_identify(config, email, phone).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn open_store(config: &ContactLinkConfig) -> Result<Arc<dyn ContactStore>> {
    if config.storage.ephemeral {
        tracing::info!("Using in-memory contact store (contacts are not persisted)");
        return Ok(Arc::new(MemoryContactStore::new()));
    }
    let store = MemoryContactStore::open(config.storage.resolved_data_dir()).await?;
    Ok(Arc::new(store))
}

async fn run_server(
    mut config: ContactLinkConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let store = open_store(&config).await?;
    let resolver = Arc::new(IdentityResolver::with_config(store, config.resolver.clone()));
    let app = build_app(resolver, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("ContactLink listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

async fn run_identify(
    config: ContactLinkConfig,
    email: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let observation = Observation::new(email, phone);
    observation.validate()?;

    let store = open_store(&config).await?;
    let resolver = IdentityResolver::with_config(store, config.resolver);
    let contact = resolver.identify(&observation).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&IdentifyResponse { contact })?
    );
    Ok(())
}

fn show_config(config: Option<&ContactLinkConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
