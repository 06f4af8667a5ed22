use crate::config::Area;
use crate::retrieve::RetrievalRequest;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One request for one variable, year and month, producing one output file.
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadTask {
    pub dataset: Arc<str>,
    /// Variable name as the archive knows it.
    pub variable: Arc<str>,
    /// Abbreviated name used for the output subdirectory and file name.
    pub short_name: Arc<str>,
    pub year: String,
    pub month: String,
    pub days: Arc<[String]>,
    pub times: Arc<[String]>,
    pub area: Area,
    pub output_dir: Arc<PathBuf>,
    pub extension: Arc<str>,
}

impl DownloadTask {
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.{}",
            self.short_name, self.year, self.month, self.extension
        )
    }

    /// `{output_dir}/{short_name}/{short_name}_{year}_{month}.{extension}`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(&*self.short_name)
            .join(self.file_name())
    }

    pub fn request(&self) -> RetrievalRequest {
        RetrievalRequest::new(
            self.variable.to_string(),
            self.year.clone(),
            self.month.clone(),
            self.days.to_vec(),
            self.times.to_vec(),
            self.area.to_nwse(),
        )
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}-{}", self.short_name, self.year, self.month)
    }
}
