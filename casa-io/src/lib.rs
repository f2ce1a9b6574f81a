use std::fs;
use std::path::{Path, PathBuf};

use casa_core::model::Project;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project document{}: {source}", path_suffix(.path))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode project: {0}")]
    Encode(#[source] serde_json::Error),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|path| format!(" {path:?}"))
        .unwrap_or_default()
}

pub trait ProjectLoader {
    fn load(&self, path: &Path) -> Result<Project, IoError>;
}

pub trait ProjectSaver {
    fn save(&self, project: &Project, path: &Path) -> Result<(), IoError>;
}

/// 以 JSON 文档读写项目：键名使用 camelCase，时间戳为 RFC 3339。
///
/// 载入只做结构解析，业务不变量由引擎层在 `Editor::load_project` 中重新校验。
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFacade {
    pretty: bool,
}

impl JsonFacade {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// 输出紧凑 JSON（无缩进）。
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ProjectLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Project, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| IoError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }
}

impl ProjectSaver for JsonFacade {
    fn save(&self, project: &Project, path: &Path) -> Result<(), IoError> {
        let encoded = if self.pretty {
            to_json_string(project)?
        } else {
            serde_json::to_string(project).map_err(IoError::Encode)?
        };
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| IoError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, encoded).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// 将项目编码为带缩进的 JSON 文本。
pub fn to_json_string(project: &Project) -> Result<String, IoError> {
    serde_json::to_string_pretty(project).map_err(IoError::Encode)
}

/// 从 JSON 文本解析项目。
pub fn from_json_str(source: &str) -> Result<Project, IoError> {
    serde_json::from_str(source).map_err(|source| IoError::Parse { path: None, source })
}
