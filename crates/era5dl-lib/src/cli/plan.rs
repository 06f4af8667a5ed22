use crate::cli::PlanParams;
use crate::download::output_exists;
use crate::error::Era5DlError;
use crate::planner::{DownloadTask, plan_tasks};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTask {
    pub task: DownloadTask,
    pub path: PathBuf,
    pub exists: bool,
}

/// Lists the planned tasks and which of them are already on disk. Nothing is requested.
pub async fn run_plan(params: PlanParams) -> Result<Vec<PlannedTask>, Era5DlError> {
    let tasks = plan_tasks(&params.app_config);

    let mut planned = Vec::with_capacity(tasks.len());
    for task in tasks {
        let path = task.output_path();
        let exists = output_exists(&path).await;
        tracing::info!(
            "{} {}",
            if exists { "[on disk]" } else { "[pending]" },
            path.display()
        );
        planned.push(PlannedTask { task, path, exists });
    }

    let pending = planned.iter().filter(|p| !p.exists).count();
    tracing::info!(
        "{} tasks planned, {} already on disk, {} to download",
        planned.len(),
        planned.len() - pending,
        pending
    );

    Ok(planned)
}
