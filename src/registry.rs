use crate::domain::Collector;
use crate::metrics::errors::ErrorCounter;
use anyhow::bail;
use prometheus::proto::MetricFamily;
use std::collections::HashSet;

/// Holds the resource collectors and the shared error counter.
///
/// Collectors are described once, when registered, and collected concurrently on every
/// scrape. A failing collector only loses its own samples for that scrape.
pub struct Registry {
    inner: prometheus::Registry,
    errors: ErrorCounter,
    collectors: Vec<Box<dyn Collector>>,
    names: HashSet<String>,
}

impl Registry {
    pub fn new(namespace: &str) -> anyhow::Result<Self> {
        let inner = prometheus::Registry::new();
        let errors = ErrorCounter::new(namespace)?;
        errors.register(&inner)?;

        let mut names = HashSet::new();
        names.insert(errors.name());

        Ok(Self {
            inner,
            errors,
            collectors: vec![],
            names,
        })
    }

    pub fn errors(&self) -> &ErrorCounter {
        &self.errors
    }

    pub fn register(&mut self, collector: Box<dyn Collector>) -> anyhow::Result<()> {
        let descs = collector.describe();

        let mut names = HashSet::new();
        for desc in &descs {
            if self.names.contains(&desc.fq_name) || !names.insert(desc.fq_name.clone()) {
                bail!("Metric {} is already registered", desc.fq_name);
            }
        }

        tracing::debug!(metrics = ?names, "Registered collector");
        self.names.extend(names);
        self.collectors.push(collector);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub async fn gather(&self) -> Vec<MetricFamily> {
        let scrapes = self.collectors.iter().map(|collector| collector.collect());

        let mut families = futures::future::join_all(scrapes)
            .await
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        families.extend(self.inner.gather());
        families
    }

    pub async fn encode(&self) -> anyhow::Result<String> {
        let families = self.gather().await;
        let encoder = prometheus::TextEncoder::new();

        Ok(encoder.encode_to_string(&families)?)
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::domain::Collector;
    use crate::metrics::database::{self, Database, DatabaseCollector};
    use crate::metrics::no_operation::NoOpCollector;
    use crate::metrics::volume::{self, Volume, VolumeCollector};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Clone)]
    struct Fake {
        fail: bool,
    }

    impl database::DataSource for Fake {
        fn list_databases(&self) -> impl Future<Output = anyhow::Result<Vec<Database>>> + Send {
            let fail = self.fail;
            async move {
                if fail {
                    anyhow::bail!("503 Service Unavailable");
                }

                Ok(vec![Database {
                    id: "db1".to_string(),
                    status: "online".to_string(),
                    num_nodes: 1,
                    ..Default::default()
                }])
            }
        }
    }

    impl volume::DataSource for Fake {
        fn list_volumes(&self) -> impl Future<Output = anyhow::Result<Vec<Volume>>> + Send {
            async {
                Ok(vec![Volume {
                    id: "vol1".to_string(),
                    name: "data".to_string(),
                    region: "ams3".to_string(),
                    size_gigabytes: 1,
                    droplet_ids: vec![9],
                }])
            }
        }
    }

    fn registry(database_fails: bool) -> Registry {
        let mut registry = Registry::new("digitalocean").unwrap();
        let errors = registry.errors().clone();

        let db = DatabaseCollector::new(errors.clone(), Fake { fail: database_fails }, TIMEOUT);
        let vol = VolumeCollector::new(errors, Fake { fail: false }, TIMEOUT);

        registry.register(Box::new(db.unwrap())).unwrap();
        registry.register(Box::new(vol.unwrap())).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_all_collectors_are_rendered() {
        let registry = registry(false);
        assert_eq!(2, registry.len());

        let text = registry.encode().await.unwrap();
        assert!(text.contains("digitalocean_db_up{"));
        assert!(text.contains("digitalocean_db_num_nodes{"));
        assert!(text.contains(
            "digitalocean_volume_size_bytes{id=\"9\",name=\"data\",region=\"ams3\"} 1073741824"
        ));
        assert!(text.contains("digitalocean_errors_total{resource=\"database\"} 0"));
        assert!(text.contains("digitalocean_errors_total{resource=\"volume\"} 0"));
    }

    #[tokio::test]
    async fn test_failing_collector_does_not_fail_the_scrape() {
        let registry = registry(true);

        let text = registry.encode().await.unwrap();
        assert!(!text.contains("digitalocean_db_up"));
        assert!(text.contains("digitalocean_volume_size_bytes{"));
        assert!(text.contains("digitalocean_errors_total{resource=\"database\"} 1"));
        assert!(text.contains("digitalocean_errors_total{resource=\"volume\"} 0"));
    }

    #[test]
    fn test_duplicate_descriptors_are_rejected() {
        let mut registry = Registry::new("digitalocean").unwrap();
        let errors = registry.errors().clone();

        let first = DatabaseCollector::new(errors.clone(), Fake { fail: false }, TIMEOUT).unwrap();
        let second = DatabaseCollector::new(errors, Fake { fail: false }, TIMEOUT).unwrap();

        registry.register(Box::new(first)).unwrap();
        assert!(registry.register(Box::new(second)).is_err());
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_disabled_collectors_describe_nothing() {
        let mut registry = Registry::new("digitalocean").unwrap();
        let noop = NoOpCollector::new();
        assert!(noop.describe().is_empty());

        registry.register(Box::new(noop)).unwrap();
        registry.register(Box::new(NoOpCollector::new())).unwrap();
        assert_eq!(2, registry.len());
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = Registry::new("digitalocean").unwrap();
        assert!(registry.is_empty());
        assert!(registry.encode().await.unwrap().is_empty());
    }
}
