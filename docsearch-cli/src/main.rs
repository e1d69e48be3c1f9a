use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use docsearch_cli::{DEFAULT_SERVER_URL, DocsearchClient, repl};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "docsearch")]
#[command(about = "Interactive client for the docsearch API", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the docsearch server
    #[arg(long, env = "DOCSEARCH_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Warnings only unless RUST_LOG is set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();

    let client = DocsearchClient::new(&cli.server_url, Duration::from_secs(cli.timeout))
        .context("failed to build HTTP client")?;
    repl::run(&client).await
}
