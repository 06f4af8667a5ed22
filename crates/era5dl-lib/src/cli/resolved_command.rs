use crate::cli::args::{Command, ConfigOverrides};
use crate::cli::params::{DownloadParams, PlanParams};
use crate::config::{Config, load_config};
use crate::download::DownloadOptions;
use crate::error::Era5DlError;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum ResolvedCommand {
    Download(DownloadParams),
    Plan(PlanParams),
}

pub fn resolve_command(command: Command) -> Result<ResolvedCommand, Era5DlError> {
    match command {
        Command::Download {
            config_path,
            overrides,
        } => {
            let app_config = resolve_config(config_path.as_deref(), &overrides)?;
            let options = DownloadOptions::from(&app_config.download);
            Ok(ResolvedCommand::Download(DownloadParams {
                app_config,
                options,
            }))
        }
        Command::Plan {
            config_path,
            overrides,
        } => {
            let app_config = resolve_config(config_path.as_deref(), &overrides)?;
            Ok(ResolvedCommand::Plan(PlanParams { app_config }))
        }
    }
}

fn resolve_config(
    config_path: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<Config, Era5DlError> {
    for (name, value) in [
        ("max-workers", overrides.max_workers.map(|v| v as u64)),
        ("max-retries", overrides.max_retries.map(u64::from)),
    ] {
        if value == Some(0) {
            return Err(Era5DlError::CliArgumentValidation {
                details: format!("{name} must be greater than 0."),
            });
        }
    }

    if let Some(path) = config_path {
        tracing::info!("Loading configuration from {}", path);
    }
    let mut app_config = load_config(config_path)?;
    apply_overrides(&mut app_config, overrides);
    app_config.validate()?;
    Ok(app_config)
}

/// Applies command line values on top of a loaded configuration.
pub fn apply_overrides(app_config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(output_dir) = &overrides.output_dir {
        app_config.output.path = PathBuf::from(output_dir);
    }
    if let Some(start_year) = overrides.start_year {
        app_config.years.start = start_year;
    }
    if let Some(end_year) = overrides.end_year {
        app_config.years.end = end_year;
    }
    if let Some(max_workers) = overrides.max_workers {
        app_config.download.max_workers = max_workers;
    }
    if let Some(max_retries) = overrides.max_retries {
        app_config.download.max_retries = max_retries;
    }
}
