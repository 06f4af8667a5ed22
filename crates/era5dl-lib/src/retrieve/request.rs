use serde::{Deserialize, Serialize};

pub const OUTPUT_FORMAT: &str = "netcdf";
pub const DOWNLOAD_FORMAT: &str = "unarchived";

/// Request parameters for one month of one variable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetrievalRequest {
    /// Always a single variable.
    pub variable: Vec<String>,
    pub year: String,
    pub month: String,
    pub day: Vec<String>,
    pub time: Vec<String>,
    pub format: String,
    /// `[north, west, south, east]`
    pub area: [f64; 4],
    pub download_format: String,
}

impl RetrievalRequest {
    pub fn new(
        variable: String,
        year: String,
        month: String,
        day: Vec<String>,
        time: Vec<String>,
        area: [f64; 4],
    ) -> Self {
        Self {
            variable: vec![variable],
            year,
            month,
            day,
            time,
            format: OUTPUT_FORMAT.to_string(),
            area,
            download_format: DOWNLOAD_FORMAT.to_string(),
        }
    }
}
