use prometheus::{IntCounterVec, Opts, Registry};

/// Upstream failures per resource type, shared by every collector.
#[derive(Clone)]
pub struct ErrorCounter {
    errors: IntCounterVec,
}

impl ErrorCounter {
    pub fn new(namespace: &str) -> anyhow::Result<Self> {
        let opts = Opts::new(
            format!("{}_errors_total", namespace),
            "The total number of errors per resource type",
        );
        let errors = IntCounterVec::new(opts, &["resource"])?;

        Ok(Self { errors })
    }

    pub fn register(&self, registry: &Registry) -> anyhow::Result<()> {
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }

    pub fn name(&self) -> String {
        use prometheus::core::Collector;
        self.errors.desc()[0].fq_name.clone()
    }

    /// Exposes the label with a zero value so that "no errors yet" is visible on the first scrape.
    pub fn init(&self, resource: &str) {
        self.errors.with_label_values(&[resource]).inc_by(0);
    }

    pub fn inc(&self, resource: &str) {
        self.errors.with_label_values(&[resource]).inc();
    }

    pub fn get(&self, resource: &str) -> u64 {
        self.errors.with_label_values(&[resource]).get()
    }
}
