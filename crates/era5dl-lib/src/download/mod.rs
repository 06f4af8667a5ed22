mod downloader;
mod types;

pub use downloader::{download_all, execute_task, output_exists};
pub use types::{CrashedTask, DownloadOptions, DownloadSummary, TaskError, TaskOutcome};
