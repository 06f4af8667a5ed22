use crate::config::Config;
use crate::download::DownloadOptions;

#[derive(Debug, Clone)]
pub struct DownloadParams {
    pub app_config: Config,
    pub options: DownloadOptions,
}

#[derive(Debug, Clone)]
pub struct PlanParams {
    pub app_config: Config,
}
