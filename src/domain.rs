use crate::metrics::errors::ErrorCounter;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;

/// A configurable family of metrics backed by a data source.
pub trait Metric<T> {
    fn build(self, errors: &ErrorCounter, data_source: T) -> anyhow::Result<Box<dyn Collector>>;
}

/// A per-resource collector driven by the [`Registry`](crate::registry::Registry).
///
/// `describe` is called once, when the collector is registered, and must return every
/// descriptor `collect` will ever use. `collect` is called on every scrape and never
/// fails: upstream errors are counted and logged by the collector itself.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    fn describe(&self) -> Vec<&Desc>;

    async fn collect(&self) -> Vec<MetricFamily>;
}
