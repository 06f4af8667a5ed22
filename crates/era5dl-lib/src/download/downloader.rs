use super::types::{CrashedTask, DownloadOptions, DownloadSummary, TaskError, TaskOutcome};
use crate::planner::DownloadTask;
use crate::retrieve::Retriever;
use crate::retry::{Exhausted, RetryPolicy, Sleeper, Succeeded, run_with_retry};
use crate::verification::verify_output;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, debug, error, info, warn};

/// Runs every task with at most `options.max_workers` in flight and waits for all of them.
///
/// Individual failures never abort the run; they are reported in the summary.
pub async fn download_all(
    tasks: Vec<DownloadTask>,
    retriever: Arc<dyn Retriever>,
    sleeper: Arc<dyn Sleeper>,
    options: DownloadOptions,
) -> DownloadSummary {
    let semaphore = Arc::new(Semaphore::new(options.max_workers.max(1)));
    let policy = options.retry;

    let mut futs = FuturesUnordered::new();
    for task in tasks {
        let label = task.to_string();
        let path = task.output_path();
        let span = tracing::info_span!("task", output = %path.display());

        let semaphore = semaphore.clone();
        let retriever = retriever.clone();
        let sleeper = sleeper.clone();
        let handle = tokio::spawn(
            async move {
                // The permit is held through retries and backoff sleeps.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => {
                        return TaskOutcome::Failed {
                            path: task.output_path(),
                            attempts: 0,
                            last_error: err.to_string(),
                        };
                    }
                };
                execute_task(&task, retriever.as_ref(), sleeper.as_ref(), &policy).await
            }
            .instrument(span),
        );

        futs.push(async move { (label, path, handle.await) });
    }

    info!("Waiting for {} downloads to finish...", futs.len());

    let mut summary = DownloadSummary::default();
    while let Some((label, path, res)) = futs.next().await {
        match res {
            Ok(outcome) => {
                info!("Task ({}): {}", label, outcome);
                summary.outcomes.push(outcome);
            }
            Err(join_error) => {
                error!(
                    "Task ({}) generated an unexpected error: {}",
                    label, join_error
                );
                summary.crashed.push(CrashedTask {
                    label,
                    path,
                    reason: join_error.to_string(),
                });
            }
        }
    }

    summary
}

/// Skip-if-exists, then retrieve with retries. Always returns a terminal outcome.
pub async fn execute_task(
    task: &DownloadTask,
    retriever: &dyn Retriever,
    sleeper: &dyn Sleeper,
    policy: &RetryPolicy,
) -> TaskOutcome {
    let path = task.output_path();

    // Sibling tasks for the same variable race here; create_dir_all tolerates that.
    if let Some(parent) = path.parent() {
        if let Err(err) = tokio::fs::create_dir_all(parent).await {
            error!("Failed to create directory {}: {}", parent.display(), err);
            return TaskOutcome::Failed {
                last_error: format!("Failed to create directory {}: {}", parent.display(), err),
                path,
                attempts: 0,
            };
        }
    }

    if output_exists(&path).await {
        info!("File {} already on disk. Skipping.", path.display());
        return TaskOutcome::Skipped { path };
    }

    info!("Requesting {}", path.display());

    let request = task.request();
    let request = &request;
    let dataset = task.dataset.as_ref();
    let destination = path.as_path();

    let result = run_with_retry(policy, sleeper, move |attempt| async move {
        debug!(attempt, "Issuing retrieval");
        let outcome = attempt_retrieval(retriever, dataset, request, destination).await;
        if outcome.is_err() {
            discard_output(destination).await;
        }
        outcome
    })
    .await;

    match result {
        Ok(Succeeded { value: bytes, attempts }) => {
            info!(bytes, attempts, "Successfully downloaded: {}", path.display());
            TaskOutcome::Success { path, attempts }
        }
        Err(Exhausted {
            attempts,
            last_error,
        }) => {
            error!(
                "Failed to download {} after {} attempts.",
                path.display(),
                attempts
            );
            TaskOutcome::Failed {
                path,
                attempts,
                last_error: last_error.to_string(),
            }
        }
    }
}

async fn attempt_retrieval(
    retriever: &dyn Retriever,
    dataset: &str,
    request: &crate::retrieve::RetrievalRequest,
    destination: &Path,
) -> Result<u64, TaskError> {
    retriever.retrieve(dataset, request, destination).await?;
    Ok(verify_output(destination).await?)
}

/// Whether a task's output is already on disk. Only a regular file counts.
pub async fn output_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

/// A failed attempt must not leave anything that a restart would mistake for a finished download.
async fn discard_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed incomplete output {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "Failed to remove incomplete output {}: {}",
            path.display(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, VariableDef};
    use crate::planner::plan_tasks;
    use crate::retrieve::{RetrievalRequest, RetrieveError};
    use crate::retry::NoopSleeper;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then writes a small file.
    struct FlakyRetriever {
        failures: u32,
        calls: AtomicU32,
        write_on_failure: bool,
    }

    impl FlakyRetriever {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                write_on_failure: false,
            }
        }
    }

    #[async_trait]
    impl Retriever for FlakyRetriever {
        async fn retrieve(
            &self,
            _dataset: &str,
            _request: &RetrievalRequest,
            destination: &Path,
        ) -> Result<(), RetrieveError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                if self.write_on_failure {
                    tokio::fs::write(destination, b"trunc").await?;
                }
                return Err(RetrieveError::Failed(format!("call {call} failed")));
            }
            tokio::fs::write(destination, b"CDF\x01netcdf").await?;
            Ok(())
        }
    }

    fn one_task(dir: &Path) -> DownloadTask {
        let mut config = Config::default();
        config.variables = vec![VariableDef::new("2m_temperature", "tas")];
        config.months = vec![1];
        config.output.path = dir.to_path_buf();
        plan_tasks(&config).remove(0)
    }

    #[tokio::test]
    async fn test_existing_file_is_skipped_without_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        let task = one_task(dir.path());
        let path = task.output_path();
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, b"existing").await.unwrap();

        let retriever = FlakyRetriever::new(0);
        let outcome =
            execute_task(&task, &retriever, &NoopSleeper, &RetryPolicy::default()).await;

        assert_eq!(outcome, TaskOutcome::Skipped { path });
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_directory_at_output_path_is_not_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let task = one_task(dir.path());
        let path = task.output_path();
        tokio::fs::create_dir_all(&path).await.unwrap();

        assert!(!output_exists(&path).await);
        let retriever = FlakyRetriever::new(0);
        let outcome =
            execute_task(&task, &retriever, &NoopSleeper, &RetryPolicy::default()).await;

        assert!(!outcome.is_skipped());
        assert!(retriever.calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let dir = tempfile::tempdir().unwrap();
        let task = one_task(dir.path());

        let retriever = FlakyRetriever::new(2);
        let outcome =
            execute_task(&task, &retriever, &NoopSleeper, &RetryPolicy::default()).await;

        assert_eq!(
            outcome,
            TaskOutcome::Success {
                path: task.output_path(),
                attempts: 3
            }
        );
        assert_eq!(retriever.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_attempts_leave_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let task = one_task(dir.path());

        let mut retriever = FlakyRetriever::new(u32::MAX);
        retriever.write_on_failure = true;
        let outcome =
            execute_task(&task, &retriever, &NoopSleeper, &RetryPolicy::default()).await;

        assert!(outcome.is_failed());
        assert_eq!(outcome.attempts(), 3);
        assert!(!task.output_path().exists());
    }

    #[tokio::test]
    async fn test_success_without_output_counts_as_failure() {
        struct SilentRetriever;

        #[async_trait]
        impl Retriever for SilentRetriever {
            async fn retrieve(
                &self,
                _dataset: &str,
                _request: &RetrievalRequest,
                _destination: &Path,
            ) -> Result<(), RetrieveError> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let task = one_task(dir.path());
        let outcome =
            execute_task(&task, &SilentRetriever, &NoopSleeper, &RetryPolicy::default()).await;

        match outcome {
            TaskOutcome::Failed {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("does not exist"), "{last_error}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_download_all_collects_every_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.path = dir.path().to_path_buf();
        let tasks = plan_tasks(&config);
        let expected = tasks.len();

        let summary = download_all(
            tasks,
            Arc::new(FlakyRetriever::new(0)),
            Arc::new(NoopSleeper),
            DownloadOptions {
                max_workers: 3,
                retry: RetryPolicy::default(),
            },
        )
        .await;

        assert_eq!(summary.total(), expected);
        assert_eq!(summary.succeeded(), expected);
        assert!(dir.path().join("pr").join("pr_1966_12.nc").is_file());
    }
}
