use config::{Case, Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// File stem looked up when no explicit path is given (`modhub.toml`, `modhub.json`, ...).
pub const DEFAULT_CONFIG_NAME: &str = "modhub";

/// Prefix of environment overrides, e.g. `MODHUB__LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "MODHUB";

#[modhub_derive::modhub_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads `T` from a config file overlaid with `MODHUB__*` environment variables.
///
/// With `Some(path)` the file must exist. With `None` an optional `modhub.*` file in the working
/// directory is used, so a bare environment (or nothing at all, given serde defaults) is enough.
/// Nested keys use a double underscore: `MODHUB__FEATURES__LOAD_TIMEOUT_MS=500`. The
/// `features.preload` list accepts comma separated names.
///
/// # Errors
/// Returns [`ConfigError`] if a required file is missing or the merged values do not
/// deserialize into `T`.
///
/// # Example
/// ```rust
/// use modhub_kernel::config::load_config;
/// use modhub_kernel::domain::config::AppConfig;
///
/// let cfg: AppConfig = load_config(None::<&str>).unwrap_or_default();
/// assert!(cfg.logging.console);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(path) => {
            info!(path = %path.as_ref().display(), "Loading config");
            File::from(path.as_ref()).required(true)
        },
        None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .convert_case(Case::Snake)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("features.preload"),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
