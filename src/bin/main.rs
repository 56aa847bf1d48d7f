use digitalocean_exporter::bootstrap::init_registry;
use digitalocean_exporter::config::Configuration;
use digitalocean_exporter::logging::setup_logging;
use digitalocean_exporter::server::start_server;
use digitalocean_exporter::server::state::AppState;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Arc::new(Configuration::load()?);
    let _guard = setup_logging(&configuration.log)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting DigitalOcean exporter");
    tracing::debug!(configuration = ?configuration, "Loaded configuration");

    let registry = Arc::new(init_registry(&configuration)?);

    let state = AppState {
        configuration,
        registry,
    };

    start_server(state).await?;
    tracing::info!("Bye!");

    Ok(())
}
