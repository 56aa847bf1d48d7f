use crate::domain::Collector;
use prometheus::core::Desc;
use prometheus::proto::MetricFamily;

/// Stands in for a collector that has been disabled in the configuration.
pub struct NoOpCollector {
    //
}

impl NoOpCollector {
    pub fn new() -> Self {
        Self {}
    }
}

#[async_trait::async_trait]
impl Collector for NoOpCollector {
    fn describe(&self) -> Vec<&Desc> {
        Vec::new()
    }

    async fn collect(&self) -> Vec<MetricFamily> {
        Vec::new()
    }
}
