use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_DATASET: &str = "reanalysis-era5-land";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("Start year {start} is after end year {end}")]
    InvertedYearRange { start: u32, end: u32 },

    #[error("Month {0} is outside 1..=12")]
    InvalidMonth(u32),

    #[error("No months configured")]
    NoMonths,

    #[error("No variables configured")]
    NoVariables,

    #[error("Variable {name} has an empty short name")]
    EmptyShortName { name: String },

    #[error("Short name {short_name} is used by more than one variable")]
    DuplicateShortName { short_name: String },

    #[error("Area is invalid: {details}")]
    InvalidArea { details: String },

    #[error("{field} must be greater than 0")]
    Zero { field: &'static str },

    #[error("Retry delay range {min_secs}..={max_secs} is inverted")]
    InvertedDelayRange { min_secs: u64, max_secs: u64 },
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub dataset: String,
    pub years: YearRange,
    pub months: Vec<u32>,
    pub area: Area,
    pub variables: Vec<VariableDef>,
    pub output: OutputConfig,
    pub download: DownloadConfig,
    pub api: Option<ApiConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            years: YearRange::default(),
            months: (1..=12).collect(),
            area: Area::default(),
            variables: vec![
                VariableDef::new("2m_temperature", "tas"),
                VariableDef::new("total_precipitation", "pr"),
            ],
            output: OutputConfig::default(),
            download: DownloadConfig::default(),
            api: None,
        }
    }
}

/// Inclusive range of years to download.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct YearRange {
    pub start: u32,
    pub end: u32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1966,
            end: 1966,
        }
    }
}

impl YearRange {
    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Geographic bounding box in degrees.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Area {
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            north: 10.0,
            west: 90.0,
            south: -15.0,
            east: 145.0,
        }
    }
}

impl Area {
    /// The `[north, west, south, east]` order the archive expects.
    pub fn to_nwse(self) -> [f64; 4] {
        [self.north, self.west, self.south, self.east]
    }
}

/// Maps the archive's variable name onto the short name used for directories and files.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VariableDef {
    pub name: String,
    pub short_name: String,
}

impl VariableDef {
    pub fn new(name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: short_name.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            extension: "nc".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct DownloadConfig {
    pub max_workers: usize,
    pub max_retries: u32,
    pub retry_delay: RetryDelayConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_workers: 12,
            max_retries: 3,
            retry_delay: RetryDelayConfig::default(),
        }
    }
}

/// Base range of the retry delay in seconds, before scaling by the attempt number.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetryDelayConfig {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for RetryDelayConfig {
    fn default() -> Self {
        Self {
            min_secs: 30,
            max_secs: 180,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    pub url: String,
    pub key: String,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.years.start > self.years.end {
            return Err(ConfigValidationError::InvertedYearRange {
                start: self.years.start,
                end: self.years.end,
            });
        }

        if self.months.is_empty() {
            return Err(ConfigValidationError::NoMonths);
        }
        if let Some(month) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(ConfigValidationError::InvalidMonth(*month));
        }

        if self.variables.is_empty() {
            return Err(ConfigValidationError::NoVariables);
        }
        let mut short_names = HashSet::new();
        for variable in &self.variables {
            if variable.short_name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyShortName {
                    name: variable.name.clone(),
                });
            }
            if !short_names.insert(variable.short_name.as_str()) {
                return Err(ConfigValidationError::DuplicateShortName {
                    short_name: variable.short_name.clone(),
                });
            }
        }

        self.validate_area()?;

        if self.download.max_workers == 0 {
            return Err(ConfigValidationError::Zero {
                field: "download.max_workers",
            });
        }
        if self.download.max_retries == 0 {
            return Err(ConfigValidationError::Zero {
                field: "download.max_retries",
            });
        }
        let delay = self.download.retry_delay;
        if delay.min_secs > delay.max_secs {
            return Err(ConfigValidationError::InvertedDelayRange {
                min_secs: delay.min_secs,
                max_secs: delay.max_secs,
            });
        }

        Ok(())
    }

    fn validate_area(&self) -> Result<(), ConfigValidationError> {
        let Area {
            north,
            west,
            south,
            east,
        } = self.area;

        for (name, latitude) in [("north", north), ("south", south)] {
            if !(-90.0..=90.0).contains(&latitude) {
                return Err(ConfigValidationError::InvalidArea {
                    details: format!("{name} latitude {latitude} is outside -90..=90"),
                });
            }
        }
        for (name, longitude) in [("west", west), ("east", east)] {
            if !(-180.0..=360.0).contains(&longitude) {
                return Err(ConfigValidationError::InvalidArea {
                    details: format!("{name} longitude {longitude} is outside -180..=360"),
                });
            }
        }
        if north < south {
            return Err(ConfigValidationError::InvalidArea {
                details: format!("north ({north}) is below south ({south})"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_area_order() {
        assert_eq!(Area::default().to_nwse(), [10.0, 90.0, -15.0, 145.0]);
    }

    #[test]
    fn test_inverted_year_range_rejected() {
        let mut config = Config::default();
        config.years = YearRange {
            start: 2000,
            end: 1999,
        };
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvertedYearRange {
                start: 2000,
                end: 1999
            })
        );
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        let mut config = Config::default();
        config.months = vec![1, 13];
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidMonth(13))
        );

        config.months = vec![];
        assert_eq!(config.validate(), Err(ConfigValidationError::NoMonths));
    }

    #[test]
    fn test_duplicate_short_name_rejected() {
        let mut config = Config::default();
        config.variables = vec![
            VariableDef::new("2m_temperature", "tas"),
            VariableDef::new("skin_temperature", "tas"),
        ];
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::DuplicateShortName {
                short_name: "tas".to_string()
            })
        );
    }

    #[test]
    fn test_empty_short_name_rejected() {
        let mut config = Config::default();
        config.variables = vec![VariableDef::new("2m_temperature", " ")];
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::EmptyShortName { .. })
        ));
    }

    #[test]
    fn test_zero_workers_and_retries_rejected() {
        let mut config = Config::default();
        config.download.max_workers = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Zero {
                field: "download.max_workers"
            })
        );

        let mut config = Config::default();
        config.download.max_retries = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::Zero {
                field: "download.max_retries"
            })
        );
    }

    #[test]
    fn test_inverted_delay_range_rejected() {
        let mut config = Config::default();
        config.download.retry_delay = RetryDelayConfig {
            min_secs: 10,
            max_secs: 5,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvertedDelayRange { .. })
        ));
    }

    #[test]
    fn test_area_north_below_south_rejected() {
        let mut config = Config::default();
        config.area.north = -20.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidArea { .. })
        ));
    }
}
