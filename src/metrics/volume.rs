use crate::domain::{Collector, Metric};
use crate::metrics::errors::ErrorCounter;
use crate::metrics::gauge::{GaugeBatch, GaugeDescriptor};
use crate::metrics::list_within;
use crate::metrics::no_operation::NoOpCollector;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use serde::Deserialize;
use std::time::Duration;

const RESOURCE: &str = "volume";
const LABELS: [&str; 3] = ["id", "name", "region"];
const BYTES_PER_GIB: f64 = (1u64 << 30) as f64;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A block-storage volume as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub region: String,
    pub size_gigabytes: u64,
    pub droplet_ids: Vec<u64>,
}

impl Volume {
    /// The `id` label carries the first attached droplet rather than the volume itself, so
    /// that sizes can be joined against droplet dashboards. Detached volumes have no labels.
    fn labels(&self) -> Option<[String; 3]> {
        let droplet = self.droplet_ids.first()?;
        Some([droplet.to_string(), self.name.clone(), self.region.clone()])
    }

    fn size_bytes(&self) -> f64 {
        self.size_gigabytes as f64 * BYTES_PER_GIB
    }
}

pub trait DataSource {
    fn list_volumes(&self) -> impl Future<Output = anyhow::Result<Vec<Volume>>> + Send;
}

pub struct Volumes {
    config: Config,
    timeout: Duration,
}

impl Volumes {
    pub fn new(config: Config, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl<T> Metric<T> for Volumes
where
    T: DataSource + Send + Sync + 'static,
{
    fn build(self, errors: &ErrorCounter, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new()));
        }

        let collector = VolumeCollector::new(errors.clone(), data_source, self.timeout)?;
        Ok(Box::new(collector))
    }
}

pub struct VolumeCollector<T> {
    errors: ErrorCounter,
    data_source: T,
    timeout: Duration,
    size: GaugeDescriptor,
}

impl<T> VolumeCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    pub fn new(errors: ErrorCounter, data_source: T, timeout: Duration) -> anyhow::Result<Self> {
        errors.init(RESOURCE);

        let size = GaugeDescriptor::new(
            "digitalocean_volume_size_bytes",
            "Volume's size in bytes",
            &LABELS,
        )?;

        Ok(Self {
            errors,
            data_source,
            timeout,
            size,
        })
    }

    fn samples(&self, volumes: &[Volume]) -> anyhow::Result<Vec<MetricFamily>> {
        let mut size = GaugeBatch::new(&self.size)?;

        for volume in volumes {
            let Some(labels) = volume.labels() else {
                tracing::warn!(
                    resource = RESOURCE,
                    volume = %volume.id,
                    name = %volume.name,
                    "Skipping volume without an attached droplet"
                );
                continue;
            };

            size.set(&labels.each_ref().map(String::as_str), volume.size_bytes())?;
        }

        Ok(size.finish())
    }
}

#[async_trait::async_trait]
impl<T> Collector for VolumeCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    fn describe(&self) -> Vec<&Desc> {
        vec![self.size.desc()]
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        let list = self.data_source.list_volumes();
        let Some(volumes) = list_within(RESOURCE, &self.errors, self.timeout, list).await else {
            return Vec::new();
        };

        tracing::debug!(resource = RESOURCE, count = volumes.len(), "Listed volumes");

        self.samples(&volumes).unwrap_or_else(|e| {
            tracing::error!(resource = RESOURCE, error = %e, "Failed to build volume metrics");
            Vec::new()
        })
    }
}
