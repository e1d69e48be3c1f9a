use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docsearch_server::settings::env_lookup;
use docsearch_server::{
    AppState, Settings, Severity, build_manager, init_tracing, run_server, validate_environment,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "docsearch-server")]
#[command(about = "Semantic document search API", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API (default)
    Serve,
    /// Create or connect to the vector index, then exit
    InitIndex,
    /// Print the resolved configuration and environment report
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let settings = Settings::from_env();
    init_tracing(settings.debug);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(settings).await,
        Commands::InitIndex => init_index(settings).await,
        Commands::Config => {
            print_config(&settings);
            Ok(())
        }
    }
}

async fn serve(settings: Settings) -> Result<()> {
    let manager = build_manager(&settings).context("cannot start server")?;
    let state = AppState::new(Arc::new(manager), settings)?;
    run_server(state).await
}

async fn init_index(settings: Settings) -> Result<()> {
    let manager = build_manager(&settings)?;
    manager.init_index(settings.embedding_dimension).await?;
    let stats = manager.get_stats().await?;
    info!(
        index = manager.index_name(),
        total_vectors = stats.total_vectors,
        dimension = stats.dimension,
        "index ready"
    );
    manager.shutdown().await;
    Ok(())
}

fn print_config(settings: &Settings) {
    let issues = validate_environment(env_lookup);
    print!("{}", settings.report(&issues));
    if issues.iter().any(|issue| issue.severity == Severity::Error) {
        println!("\nRequired variables are missing; `serve` will refuse to start.");
    }
}
