use super::Config;
use crate::error::Era5DlError;
use config::{Config as ConfigBuilder, Environment};

pub const ENV_PREFIX: &str = "ERA5DL";

/// Reads the configuration: built-in defaults, then the optional file, then
/// `ERA5DL__*` variables. Callers validate after applying their own overrides.
pub fn load_config(config_path: Option<&str>) -> Result<Config, Era5DlError> {
    let mut builder = ConfigBuilder::builder();
    if let Some(config_path) = config_path {
        builder = builder.add_source(config::File::with_name(config_path));
    }
    let config_builder = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config_builder.try_deserialize()?)
}
