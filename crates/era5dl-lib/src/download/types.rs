use crate::config::DownloadConfig;
use crate::retrieve::RetrieveError;
use crate::retry::RetryPolicy;
use crate::verification::VerificationError;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single attempt failed.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Terminal result of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The file was already on disk; nothing was requested.
    Skipped { path: PathBuf },
    Success {
        path: PathBuf,
        attempts: u32,
    },
    Failed {
        path: PathBuf,
        attempts: u32,
        last_error: String,
    },
}

impl TaskOutcome {
    pub fn path(&self) -> &Path {
        match self {
            TaskOutcome::Skipped { path }
            | TaskOutcome::Success { path, .. }
            | TaskOutcome::Failed { path, .. } => path,
        }
    }

    /// Number of retrieval calls made for the task.
    pub fn attempts(&self) -> u32 {
        match self {
            TaskOutcome::Skipped { .. } => 0,
            TaskOutcome::Success { attempts, .. } | TaskOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskOutcome::Skipped { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Skipped { path } => {
                write!(f, "Skipped: {} (already exists)", path.display())
            }
            TaskOutcome::Success { path, .. } => write!(f, "Success: {}", path.display()),
            TaskOutcome::Failed {
                path,
                attempts,
                last_error,
            } => write!(
                f,
                "Failed: {} after {} attempts ({})",
                path.display(),
                attempts,
                last_error
            ),
        }
    }
}

/// A task whose execution ended outside its own error handling, e.g. a panic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrashedTask {
    pub label: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a download run produced, in completion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub outcomes: Vec<TaskOutcome>,
    pub crashed: Vec<CrashedTask>,
}

impl DownloadSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len() + self.crashed.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn crashed(&self) -> usize {
        self.crashed.len()
    }

    /// Total retrieval calls across all tasks.
    pub fn attempts(&self) -> u32 {
        self.outcomes.iter().map(TaskOutcome::attempts).sum()
    }

    pub fn outcome_for(&self, path: &Path) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.path() == path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadOptions {
    pub max_workers: usize,
    pub retry: RetryPolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from(&DownloadConfig::default())
    }
}

impl From<&DownloadConfig> for DownloadOptions {
    fn from(download: &DownloadConfig) -> Self {
        Self {
            max_workers: download.max_workers,
            retry: RetryPolicy::from(download),
        }
    }
}
