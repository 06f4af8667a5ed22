mod loader;
mod model;

pub use loader::{ENV_PREFIX, load_config};
pub use model::{
    ApiConfig, Area, Config, ConfigValidationError, DEFAULT_DATASET, DownloadConfig,
    OutputConfig, RetryDelayConfig, VariableDef, YearRange,
};
