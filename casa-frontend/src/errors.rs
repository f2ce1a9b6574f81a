use casa_engine::errors::ModelError;
use casa_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("项目数据无效: {0}")]
    Model(#[from] ModelError),
    #[error("配置无效: {0}")]
    InvalidConfig(String),
    #[error("演示脚本得到意外的工具结果: {0}")]
    UnexpectedOutcome(String),
}
