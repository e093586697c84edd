use anyhow::Context;
use bizdev_rest_api::api::{self, AppState};
use bizdev_rest_api::config::{home_company_from_env, DbConfig};
use bizdev_rest_api::db::Database;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// The address to bind to
        #[arg(short, long, default_value = "127.0.0.1:37240")]
        addr: SocketAddr,
    },
    /// Create the schema and tables the server expects
    InitDb,
    /// Client commands
    Client {
        /// The base URL of the API
        #[arg(long, default_value = bizdev_rest_api::BASE_URL)]
        url: String,
        /// Session token sent as the session cookie
        #[arg(long, env = "SESSION_TOKEN", default_value = "")]
        session: String,
        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Check that the server is up
    Health,
    /// Proposal commands
    Proposals {
        #[command(subcommand)]
        command: ProposalCommands,
    },
}

#[derive(Subcommand)]
enum ProposalCommands {
    /// List proposals
    List {
        /// Filters as key=value, e.g. category=Pursuits or stage_in=Fee Proposal
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Show a single proposal
    Get {
        /// The proposal ID
        id: i64,
    },
    /// Show the dashboard counts
    Counts,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn serve(addr: SocketAddr) -> anyhow::Result<()> {
    let config = DbConfig::from_env().context("Invalid database configuration")?;
    info!(
        "Using {:?} connections to schema {}",
        config.strategy, config.schema
    );

    let db = Database::new(&config);
    if let Err(e) = db.init().await {
        warn!("Database not reachable at startup: {}", e);
    }

    let state = AppState::new(db.clone()).with_home_company(&home_company_from_env());
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind {addr}"))?;
    info!("Starting server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.shutdown();
    info!("Server stopped");
    Ok(())
}

async fn init_db() -> anyhow::Result<()> {
    let config = DbConfig::from_env().context("Invalid database configuration")?;
    let db = Database::new(&config);
    db.install_schema()
        .await
        .with_context(|| format!("Could not install schema {}", config.schema))?;
    db.shutdown();
    info!("Schema {} is ready", config.schema);
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => serve(addr).await,
        Commands::InitDb => init_db().await,
        Commands::Client {
            url,
            session,
            command,
        } => {
            use bizdev_rest_api::client;
            match command {
                ClientCommands::Health => print_json(&client::fetch_health(&url, &session).await?),
                ClientCommands::Proposals { command } => match command {
                    ProposalCommands::List { filters } => {
                        print_json(&client::fetch_proposals(&url, &session, &filters).await?)
                    }
                    ProposalCommands::Get { id } => {
                        print_json(&client::fetch_proposal(&url, &session, id).await?)
                    }
                    ProposalCommands::Counts => {
                        print_json(&client::fetch_counts(&url, &session).await?)
                    }
                },
            }
        }
    }
}
