use crate::config::Log;
use anyhow::anyhow;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber. The returned guard flushes buffered records when
/// dropped, so it must live as long as the process.
pub fn setup_logging(config: &Log) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = match &config.directory {
        Some(directory) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(env!("CARGO_PKG_NAME"))
                .filename_suffix("log")
                .build(directory)?;
            tracing_appender::non_blocking(appender)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let ansi = config.directory.is_none();

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(writer).with_ansi(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(ansi).with_target(true))
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::setup_logging;
    use crate::config::Log;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = Log {
            level: "digitalocean_exporter=verbose".to_string(),
            ..Default::default()
        };

        // RUST_LOG takes precedence over the configured level
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(setup_logging(&config).is_err());
        }
    }
}
