use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 覆盖配置文件位置的环境变量。
pub const CONFIG_ENV: &str = "CASA_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `CASA_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 编辑器行为：撤销深度与指针容差（米）。
#[derive(Debug, Clone, Deserialize)]
pub struct EditorConfig {
    #[serde(default = "EditorConfig::default_history_depth")]
    pub history_depth: usize,
    #[serde(default = "EditorConfig::default_hit_tolerance")]
    pub hit_tolerance: f64,
    #[serde(default = "EditorConfig::default_close_tolerance")]
    pub close_tolerance: f64,
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl EditorConfig {
    fn default_history_depth() -> usize {
        100
    }

    fn default_hit_tolerance() -> f64 {
        0.25
    }

    fn default_close_tolerance() -> f64 {
        0.3
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: Self::default_history_depth(),
            hit_tolerance: Self::default_hit_tolerance(),
            close_tolerance: Self::default_close_tolerance(),
            settings: SettingsConfig::default(),
        }
    }
}

/// 新建项目使用的默认设置。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// `meters`、`centimeters`、`feet` 或 `inches`。
    pub unit: String,
    pub grid_size: f64,
    pub snap_to_grid: bool,
    pub snap_to_angle: bool,
    pub snap_angles: Vec<f64>,
    pub wall_height: f64,
    pub wall_thickness: f64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            unit: "meters".to_string(),
            grid_size: 0.5,
            snap_to_grid: true,
            snap_to_angle: true,
            snap_angles: vec![0.0, 45.0, 90.0, 135.0],
            wall_height: 2.8,
            wall_thickness: 0.15,
        }
    }
}

/// 项目文件位置。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// 启动时打开的项目 JSON。
    #[serde(default)]
    pub project_path: Option<PathBuf>,
    /// 退出前写出的项目 JSON。
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
