//! Application configuration. The config is created with opinionated defaults,
//! which can be overwritten by a `wellspring.json` file or environment
//! variables prefixed with `WELLSPRING_`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "WELLSPRING";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "wellspring.json";

/// Bootstrap configuration used by
/// [Application](crate::application::Application).
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the
    /// application.
    pub install_tracing_logger: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
        }
    }
}

impl ApplicationConfig {
    /// Layers the default values with the config file and the environment.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
}

#[cfg(test)]
mod tests {
    use crate::config::ApplicationConfig;

    #[test]
    fn should_install_logger_by_default() {
        assert!(ApplicationConfig::default().install_tracing_logger);
    }
}
