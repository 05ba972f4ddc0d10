use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// Log output settings consumed by the logger at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `modhub_kernel=debug`. `RUST_LOG` still wins.
    pub filter: Option<String>,
    pub console: bool,
    /// Rolling log files are written here when set.
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub max_files: usize,
}

/// Feature loading behaviour.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Features warmed right after bootstrap.
    pub preload: Vec<String>,
    /// Upper bound for a single caller waiting on a load. The load itself is never cancelled.
    pub load_timeout_ms: Option<u64>,
}

impl FeaturesConfig {
    #[must_use]
    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            directory: None,
            json: false,
            max_files: 10,
        }
    }
}
