use crate::domain::{Collector, Metric};
use crate::metrics::errors::ErrorCounter;
use crate::metrics::gauge::{GaugeBatch, GaugeDescriptor};
use crate::metrics::list_within;
use crate::metrics::no_operation::NoOpCollector;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;
use serde::Deserialize;
use std::time::Duration;

const RESOURCE: &str = "database";
const LABELS: [&str; 6] = ["id", "name", "region", "type", "engine", "names"];
const ONLINE: &str = "online";

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

/// A managed database cluster as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    pub id: String,
    pub name: String,
    pub region: String,
    pub size: String,
    pub engine: String,
    pub version: String,
    pub status: String,
    pub num_nodes: u32,
    pub db_names: Vec<String>,
}

impl Database {
    fn labels(&self) -> [String; 6] {
        [
            self.id.clone(),
            self.name.clone(),
            self.region.clone(),
            self.size.clone(),
            format!("{} (v{})", self.engine, self.version),
            self.db_names.join(", "),
        ]
    }

    fn online(&self) -> f64 {
        if self.status == ONLINE { 1.0 } else { 0.0 }
    }
}

pub trait DataSource {
    fn list_databases(&self) -> impl Future<Output = anyhow::Result<Vec<Database>>> + Send;
}

pub struct Databases {
    config: Config,
    timeout: Duration,
}

impl Databases {
    pub fn new(config: Config, timeout: Duration) -> Self {
        Self { config, timeout }
    }
}

impl<T> Metric<T> for Databases
where
    T: DataSource + Send + Sync + 'static,
{
    fn build(self, errors: &ErrorCounter, data_source: T) -> anyhow::Result<Box<dyn Collector>> {
        if !self.config.enabled {
            return Ok(Box::new(NoOpCollector::new()));
        }

        let collector = DatabaseCollector::new(errors.clone(), data_source, self.timeout)?;
        Ok(Box::new(collector))
    }
}

/// Exposes liveness and cluster size of every managed database.
pub struct DatabaseCollector<T> {
    errors: ErrorCounter,
    data_source: T,
    timeout: Duration,
    up: GaugeDescriptor,
    num_nodes: GaugeDescriptor,
}

impl<T> DatabaseCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    pub fn new(errors: ErrorCounter, data_source: T, timeout: Duration) -> anyhow::Result<Self> {
        errors.init(RESOURCE);

        let up = GaugeDescriptor::new(
            "digitalocean_db_up",
            "If 1 the db is up and running, 0 otherwise",
            &LABELS,
        )?;
        let num_nodes = GaugeDescriptor::new(
            "digitalocean_db_num_nodes",
            "Database's number of nodes",
            &LABELS,
        )?;

        Ok(Self {
            errors,
            data_source,
            timeout,
            up,
            num_nodes,
        })
    }

    fn samples(&self, databases: &[Database]) -> anyhow::Result<Vec<MetricFamily>> {
        let mut up = GaugeBatch::new(&self.up)?;
        let mut num_nodes = GaugeBatch::new(&self.num_nodes)?;

        for db in databases {
            let labels = db.labels();
            let labels = labels.each_ref().map(String::as_str);

            up.set(&labels, db.online())?;
            num_nodes.set(&labels, db.num_nodes as f64)?;
        }

        let mut families = up.finish();
        families.extend(num_nodes.finish());
        Ok(families)
    }
}

#[async_trait::async_trait]
impl<T> Collector for DatabaseCollector<T>
where
    T: DataSource + Send + Sync + 'static,
{
    fn describe(&self) -> Vec<&Desc> {
        vec![self.up.desc(), self.num_nodes.desc()]
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        let list = self.data_source.list_databases();
        let Some(databases) = list_within(RESOURCE, &self.errors, self.timeout, list).await else {
            return Vec::new();
        };

        tracing::debug!(resource = RESOURCE, count = databases.len(), "Listed databases");

        self.samples(&databases).unwrap_or_else(|e| {
            tracing::error!(resource = RESOURCE, error = %e, "Failed to build database metrics");
            Vec::new()
        })
    }
}
