pub mod cli;
pub mod errors;
pub mod loader;

use std::path::PathBuf;

use casa_config::AppConfig;
use errors::FrontendError;
use tracing::info;

/// 命令行传入的项目文件路径，优先于配置中的 `[storage]`。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub open: Option<PathBuf>,
    pub save: Option<PathBuf>,
}

/// 启动 CLI 演示或返回错误。
pub fn run_cli(config: &AppConfig, options: &CliOptions) -> Result<(), FrontendError> {
    info!("启动 CLI 前端");
    cli::run_demo(config, options.open.as_deref(), options.save.as_deref())
}
