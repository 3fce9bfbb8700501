use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spycat::api::{serve, AppState};
use spycat::config::ServerConfig;
use spycat::engine::AgencyService;
use spycat::providers::{CatApiBreedValidator, StaticBreedValidator};
use spycat::storage::{InMemoryStore, PostgresStorage};
use spycat::Config;

#[derive(Parser)]
#[command(name = "spycat")]
#[command(about = "Spy cat agency backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, help = "Configuration file, overrides SPY_CAT_CONF_PATH")]
        config: Option<PathBuf>,
        #[arg(long, help = "Keep all data in memory and use the built-in breed list")]
        in_memory: bool,
    },
    /// Create the database schema and exit
    Migrate {
        #[arg(long, help = "Configuration file, overrides SPY_CAT_CONF_PATH")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, in_memory } => run_server(config, in_memory).await?,
        Commands::Migrate { config } => migrate(config).await?,
    }

    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("spycat=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

async fn connect(config: &Config) -> Result<PostgresStorage> {
    let storage = PostgresStorage::connect(&config.db)
        .await
        .with_context(|| format!("cannot connect to {}", config.db.redacted_source()))?;
    storage
        .run_migrations()
        .await
        .context("cannot apply schema migrations")?;
    Ok(storage)
}

async fn run_server(config_path: Option<PathBuf>, in_memory: bool) -> Result<()> {
    let (service, server) = if in_memory {
        let server = match config_path {
            Some(path) => Config::load(path)?.server,
            None => ServerConfig::default(),
        };
        log::warn!("serving from the in-memory store, data is lost on exit");
        let service = AgencyService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticBreedValidator::common()),
        );
        (service, server)
    } else {
        let config = load_config(config_path)?;
        let storage = connect(&config).await?;
        let breeds = CatApiBreedValidator::new(&config.breed_api)?;
        let service = AgencyService::new(Arc::new(storage), Arc::new(breeds))
            .with_breed_failure_policy(config.breed_api.on_failure);
        (service, config.server)
    };

    let state = AppState {
        service: Arc::new(service),
    };
    serve(state, &server.host, server.port).await
}

async fn migrate(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    connect(&config).await?;
    log::info!("schema is up to date");
    Ok(())
}
