mod args;
mod download;
mod params;
mod plan;
mod resolved_command;

pub use args::{Args, Command, ConfigOverrides, parse_args};
pub use download::{run_download, run_download_with};
pub use params::{DownloadParams, PlanParams};
pub use plan::{PlannedTask, run_plan};
pub use resolved_command::{ResolvedCommand, apply_overrides, resolve_command};
