use clap::Parser;
use repogate_core::{FileService, SyntaxPolicy, UpdateValidator};
use repogate_remote::{GitHubClient, GitHubConfig};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "repogate-server",
    about = "REST facade for reading and committing files in GitHub repositories"
)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// JSON file with `owner`, `token` and optionally `api_url` and `branch`.
    /// Read from REPOGATE_GITHUB_* environment variables when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which updated files get a syntax check: recognized, always or off.
    #[arg(long, default_value_t = SyntaxPolicy::Recognized)]
    syntax_policy: SyntaxPolicy,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("REPOGATE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => GitHubConfig::load(path)?,
        None => GitHubConfig::from_env()?,
    };
    info!("upstream {} as {}", config.api_url, config.owner);
    if let Some(branch) = &config.branch {
        info!("committing to branch {branch}");
    }

    let client = GitHubClient::new(config)?;
    let service = FileService::new(client, UpdateValidator::new(cli.syntax_policy));
    info!("syntax policy: {}", service.validator().syntax_policy());

    let listener = TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    info!("starting repogate-server on http://{}", listener.local_addr()?);

    repogate_server::serve(listener, service, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl-C, draining connections"),
        Err(e) => {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
