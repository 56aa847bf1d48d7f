use anyhow::bail;
use prometheus::core::{Collector as _, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use std::collections::HashMap;

/// Immutable identity of a gauge: name, help text and the ordered label names.
#[derive(Debug, Clone)]
pub struct GaugeDescriptor {
    opts: Opts,
    desc: Desc,
}

impl GaugeDescriptor {
    pub fn new(name: &str, help: &str, labels: &[&str]) -> anyhow::Result<Self> {
        let labels = labels.iter().map(|label| label.to_string()).collect::<Vec<_>>();
        let desc = Desc::new(name.to_string(), help.to_string(), labels.clone(), HashMap::new())?;
        let opts = Opts::new(name, help).variable_labels(labels);

        Ok(Self { opts, desc })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn label_names(&self) -> &[String] {
        &self.desc.variable_labels
    }
}

/// Samples of one gauge gathered during a single scrape.
///
/// A batch is created from a [`GaugeDescriptor`] at the start of `collect` and dropped once
/// turned into metric families, so nothing survives from one scrape to the next.
pub struct GaugeBatch {
    gauges: GaugeVec,
    arity: usize,
    samples: usize,
}

impl GaugeBatch {
    pub fn new(descriptor: &GaugeDescriptor) -> anyhow::Result<Self> {
        let labels = descriptor
            .label_names()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>();
        let gauges = GaugeVec::new(descriptor.opts.clone(), &labels)?;

        Ok(Self {
            gauges,
            arity: labels.len(),
            samples: 0,
        })
    }

    pub fn set(&mut self, labels: &[&str], value: f64) -> anyhow::Result<()> {
        if labels.len() != self.arity {
            bail!(
                "expected {} label values for {}, got {}",
                self.arity,
                self.gauges.desc()[0].fq_name,
                labels.len()
            );
        }

        self.gauges.get_metric_with_label_values(labels)?.set(value);
        self.samples += 1;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    pub fn finish(self) -> Vec<MetricFamily> {
        // the text encoder rejects families without samples
        if self.is_empty() {
            return Vec::new();
        }

        self.gauges.collect()
    }
}
