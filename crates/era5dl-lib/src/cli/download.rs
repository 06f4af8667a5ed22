use crate::cli::DownloadParams;
use crate::download::{DownloadSummary, download_all};
use crate::error::Era5DlError;
use crate::planner::plan_tasks;
use crate::retrieve::{CdsClient, Retriever, resolve_credentials};
use crate::retry::{Sleeper, TokioSleeper};
use std::sync::Arc;
use tracing;

pub async fn run_download(params: DownloadParams) -> Result<DownloadSummary, Era5DlError> {
    let credentials = resolve_credentials(params.app_config.api.as_ref())?;
    tracing::debug!("Using API endpoint {}", credentials.url);
    let client = CdsClient::new(credentials)?;

    run_download_with(params, Arc::new(client), Arc::new(TokioSleeper)).await
}

/// Plans and downloads every task with the given retriever.
///
/// Per-task failures are reported in the summary; only setup problems are errors.
pub async fn run_download_with(
    params: DownloadParams,
    retriever: Arc<dyn Retriever>,
    sleeper: Arc<dyn Sleeper>,
) -> Result<DownloadSummary, Era5DlError> {
    let DownloadParams {
        app_config,
        options,
    } = params;

    let output_dir = &app_config.output.path;
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| Era5DlError::OutputDirectoryCreation {
            path: output_dir.clone(),
            reason: e.to_string(),
        })?;

    for variable in &app_config.variables {
        tracing::info!(
            "Processing variable: {} (short name: {})",
            variable.name,
            variable.short_name
        );
    }

    let tasks = plan_tasks(&app_config);
    if tasks.is_empty() {
        tracing::info!("No tasks to process. Check your year range and variable list.");
        return Ok(DownloadSummary::default());
    }

    tracing::info!(
        "Found {} tasks. Starting parallel downloads with {} workers...",
        tasks.len(),
        options.max_workers
    );
    let summary = download_all(tasks, retriever, sleeper, options).await;

    tracing::info!(
        succeeded = summary.succeeded(),
        skipped = summary.skipped(),
        failed = summary.failed(),
        crashed = summary.crashed(),
        "All processing finished."
    );
    if summary.failed() + summary.crashed() > 0 {
        tracing::warn!(
            "{} of {} tasks did not complete; rerun to retry them",
            summary.failed() + summary.crashed(),
            summary.total()
        );
    }

    Ok(summary)
}
