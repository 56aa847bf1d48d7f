use crate::config::Configuration;
use crate::data_source::DigitalOcean;
use crate::domain::Metric;
use crate::metrics::database::Databases;
use crate::metrics::volume::Volumes;
use crate::registry::Registry;

pub const NAMESPACE: &str = "digitalocean";

pub fn init_registry(configuration: &Configuration) -> anyhow::Result<Registry> {
    let mut registry = Registry::new(NAMESPACE)?;
    let client = DigitalOcean::new(&configuration.api)?;
    let collectors = &configuration.collectors;
    let timeout = configuration.api.timeout();

    let metric = Databases::new(collectors.database.clone(), timeout);
    let collector = metric.build(registry.errors(), client.clone())?;
    registry.register(collector)?;

    let metric = Volumes::new(collectors.volume.clone(), timeout);
    let collector = metric.build(registry.errors(), client)?;
    registry.register(collector)?;

    tracing::info!(
        databases = collectors.database.enabled,
        volumes = collectors.volume.enabled,
        timeout_ms = configuration.api.timeout_ms,
        "Collectors initialised"
    );

    Ok(registry)
}
