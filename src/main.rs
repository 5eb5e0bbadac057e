use meshrun::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meshrun=info")),
        )
        .init();

    if let Err(e) = Cli::run().await {
        eprintln!("✗ Error: {}", e);
        std::process::exit(1);
    }
}
