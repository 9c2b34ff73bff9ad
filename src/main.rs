use anyhow::Result;
use clap::Parser;
use plant_care_tracker::{cli::load_env_file, init_tracing, start_server, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env_file(None);
    let cli = Cli::parse();
    init_tracing();

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    start_server(cli).await
}
