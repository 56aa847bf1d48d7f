use crate::metrics::{database, volume};
use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Command line flags. Each one, when given, overrides the configuration file.
#[derive(Debug, Default, Parser)]
#[command(name = "digitalocean-exporter", version, about)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "DO_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// DigitalOcean API token
    #[arg(long, env = "DIGITALOCEAN_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Address to listen on for scrapes
    #[arg(long, env = "WEB_ADDR")]
    pub listen: Option<SocketAddr>,

    /// Path under which the metrics are exposed
    #[arg(long, env = "WEB_PATH")]
    pub metrics_path: Option<String>,

    /// Timeout of a single collector's API calls, in milliseconds
    #[arg(long, env = "HTTP_TIMEOUT")]
    pub timeout_ms: Option<u64>,

    /// Log filter, e.g. `info` or `digitalocean_exporter=debug`
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log: Log,
    pub server: Server,
    pub api: Api,
    pub collectors: Collectors,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Log {
    pub level: String,
    pub json: bool,
    /// Write to daily rolling files in this directory instead of stdout.
    pub directory: Option<PathBuf>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Server {
    pub listen: SocketAddr,
    pub metrics_path: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9212)),
            metrics_path: "/metrics".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Api {
    pub url: String,
    pub token: String,
    pub timeout_ms: u64,
    pub per_page: u32,
}

impl Api {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for Api {
    fn default() -> Self {
        Self {
            url: "https://api.digitalocean.com".to_string(),
            token: String::new(),
            timeout_ms: 5000,
            per_page: 200,
        }
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("per_page", &self.per_page)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Collectors {
    pub database: database::Config,
    pub volume: volume::Config,
}

impl Configuration {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let mut configuration = match &args.config {
            Some(path) => {
                let content = std::fs::read_to_string(path).with_context(|| {
                    format!("Failed to read the configuration file {}", path.display())
                })?;
                Self::parse(&content)
                    .with_context(|| format!("Invalid configuration file {}", path.display()))?
            }
            None => Self::default(),
        };

        if let Some(token) = args.token {
            configuration.api.token = token;
        }
        if let Some(listen) = args.listen {
            configuration.server.listen = listen;
        }
        if let Some(path) = args.metrics_path {
            configuration.server.metrics_path = path;
        }
        if let Some(timeout) = args.timeout_ms {
            configuration.api.timeout_ms = timeout;
        }
        if let Some(level) = args.log_level {
            configuration.log.level = level;
        }

        configuration.validate()?;
        Ok(configuration)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.api.token.trim().is_empty() {
            bail!("A DigitalOcean API token is required (--token or DIGITALOCEAN_TOKEN)");
        }
        if self.api.timeout_ms == 0 {
            bail!("The API timeout must be greater than zero");
        }
        if self.api.per_page == 0 {
            bail!("The page size must be greater than zero");
        }
        if !self.server.metrics_path.starts_with('/') || self.server.metrics_path == "/health" {
            bail!(
                "Invalid metrics path {:?}: must start with '/' and differ from /health",
                self.server.metrics_path
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Args, Configuration};
    use std::time::Duration;

    fn args(token: &str) -> Args {
        Args {
            token: Some(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let configuration = Configuration::from_args(args("secret")).unwrap();

        assert_eq!("secret", configuration.api.token);
        assert_eq!("https://api.digitalocean.com", configuration.api.url);
        assert_eq!(Duration::from_millis(5000), configuration.api.timeout());
        assert_eq!(200, configuration.api.per_page);
        assert_eq!("0.0.0.0:9212", configuration.server.listen.to_string());
        assert_eq!("/metrics", configuration.server.metrics_path);
        assert_eq!("info", configuration.log.level);
        assert!(configuration.collectors.database.enabled);
        assert!(configuration.collectors.volume.enabled);
    }

    #[test]
    fn test_missing_token_is_rejected() {
        assert!(Configuration::from_args(Args::default()).is_err());
        assert!(Configuration::from_args(args("   ")).is_err());
    }

    #[test]
    fn test_parse_file() {
        let configuration = Configuration::parse(
            r#"
            [log]
            level = "debug"
            json = true

            [server]
            listen = "127.0.0.1:9000"
            metrics_path = "/probe"

            [api]
            token = "from-file"
            timeout_ms = 1500

            [collectors.volume]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!("debug", configuration.log.level);
        assert!(configuration.log.json);
        assert_eq!("127.0.0.1:9000", configuration.server.listen.to_string());
        assert_eq!("/probe", configuration.server.metrics_path);
        assert_eq!("from-file", configuration.api.token);
        assert_eq!(1500, configuration.api.timeout_ms);
        assert_eq!(200, configuration.api.per_page);
        assert!(configuration.collectors.database.enabled);
        assert!(!configuration.collectors.volume.enabled);
    }

    #[test]
    fn test_flags_override_file() {
        let path = std::env::temp_dir().join(format!("do-exporter-{}.toml", std::process::id()));
        std::fs::write(&path, "[api]\ntoken = \"from-file\"\ntimeout_ms = 1500\n").unwrap();

        let configuration = Configuration::from_args(Args {
            config: Some(path.clone()),
            token: Some("from-flag".to_string()),
            metrics_path: Some("/do".to_string()),
            ..Default::default()
        })
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!("from-flag", configuration.api.token);
        assert_eq!(1500, configuration.api.timeout_ms);
        assert_eq!("/do", configuration.server.metrics_path);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut bad_path = args("secret");
        bad_path.metrics_path = Some("metrics".to_string());
        assert!(Configuration::from_args(bad_path).is_err());

        let mut bad_timeout = args("secret");
        bad_timeout.timeout_ms = Some(0);
        assert!(Configuration::from_args(bad_timeout).is_err());

        assert!(Configuration::parse("[api]\ntimeout_ms = \"soon\"").is_err());
    }

    #[test]
    fn test_token_is_not_printed() {
        let configuration = Configuration::from_args(args("very-secret")).unwrap();
        assert!(!format!("{:?}", configuration).contains("very-secret"));
    }
}
