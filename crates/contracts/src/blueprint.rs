//! ExportBlueprint - Config Loader 输出
//!
//! 描述一次完整的导出任务：输入日志、流选择、同步参数、时间范围、导出目标。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

use crate::{
    ContractError, OrderPolicy, PlaybackWindow, StreamId, SyncEngineConfig, DEFAULT_QUEUE_SIZE,
    DEFAULT_SLOP_S,
};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的导出任务蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 输入日志
    pub input: InputConfig,

    /// 流选择
    pub streams: StreamSelection,

    /// 同步参数
    #[serde(default)]
    pub sync: SyncSettings,

    /// 时间范围 (相对日志起点, 秒)
    #[serde(default)]
    pub range: Option<RangeConfig>,

    /// 导出目标
    pub export: ExportConfig,
}

/// 输入日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// 日志路径
    pub path: PathBuf,
}

/// 各角色对应的流名称
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSelection {
    /// 彩色图像流
    pub colour: String,
    /// 深度图像流
    pub depth: String,
    /// 相机标定流
    pub info: String,
    /// 相机位姿流 (可选)
    #[serde(default)]
    pub pose: Option<String>,
}

impl StreamSelection {
    /// Required streams in configuration order (colour first: the primary stream)
    pub fn required(&self) -> [&str; 3] {
        [&self.colour, &self.depth, &self.info]
    }

    /// All selected stream names
    pub fn all(&self) -> Vec<&str> {
        let mut names = self.required().to_vec();
        if let Some(pose) = &self.pose {
            names.push(pose);
        }
        names
    }
}

/// 同步参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SyncSettings {
    /// 每个流的队列容量
    #[serde(default = "default_queue_size")]
    #[validate(range(min = 1))]
    pub queue_size: usize,

    /// 容差窗口 (秒)
    #[serde(default = "default_slop")]
    #[validate(range(min = 0.0))]
    pub slop: f64,

    /// 乱序处理策略
    #[serde(default)]
    pub order_policy: OrderPolicy,
}

fn default_queue_size() -> usize {
    DEFAULT_QUEUE_SIZE
}

fn default_slop() -> f64 {
    DEFAULT_SLOP_S
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            slop: DEFAULT_SLOP_S,
            order_policy: OrderPolicy::default(),
        }
    }
}

/// 时间范围
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeConfig {
    pub start: f64,
    pub end: f64,
}

/// 导出目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// 导出格式 (e.g. "icl")
    pub format: String,
    /// 导出目录 (必须不存在)
    pub path: PathBuf,
}

/// 支持的导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// ICL-NUIM style RGB-D dataset
    Icl,
    /// Log a summary per frame, write nothing
    Log,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Icl, ExportFormat::Log];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Icl => "ICL",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icl" => Ok(Self::Icl),
            "log" => Ok(Self::Log),
            _ => Err(ContractError::UnknownExportFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl ExportBlueprint {
    /// Resolve the export format selector
    pub fn export_format(&self) -> Result<ExportFormat, ContractError> {
        self.export.format.parse()
    }

    /// Derive the synchronizer configuration
    pub fn to_sync_engine_config(&self) -> SyncEngineConfig {
        SyncEngineConfig::new(
            self.streams.required().map(StreamId::from),
            self.streams.pose.iter().map(StreamId::from),
        )
        .with_queue_size(self.sync.queue_size)
        .with_slop(self.sync.slop)
        .with_order_policy(self.sync.order_policy)
    }

    /// Derive the playback window
    pub fn window(&self) -> PlaybackWindow {
        match self.range {
            Some(range) => PlaybackWindow::between(range.start, range.end),
            None => PlaybackWindow::unbounded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint() -> ExportBlueprint {
        ExportBlueprint {
            version: ConfigVersion::V1,
            input: InputConfig {
                path: "log".into(),
            },
            streams: StreamSelection {
                colour: "/rgb".into(),
                depth: "/depth".into(),
                info: "/info".into(),
                pose: Some("/pose".into()),
            },
            sync: SyncSettings::default(),
            range: Some(RangeConfig {
                start: 5.0,
                end: 10.0,
            }),
            export: ExportConfig {
                format: "ICL".into(),
                path: "out".into(),
            },
        }
    }

    #[test]
    fn test_sync_config_roles() {
        let config = blueprint().to_sync_engine_config();
        assert_eq!(config.primary().map(|s| s.as_str()), Some("/rgb"));
        assert_eq!(config.required_streams().count(), 3);
        assert_eq!(config.streams.len(), 4);
        assert!(!config.streams[3].required);
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("icl".parse::<ExportFormat>().unwrap(), ExportFormat::Icl);
        assert_eq!("ICL".parse::<ExportFormat>().unwrap(), ExportFormat::Icl);
        let err = "tum".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, ContractError::UnknownExportFormat { .. }));
    }

    #[test]
    fn test_window_from_range() {
        assert_eq!(blueprint().window(), PlaybackWindow::between(5.0, 10.0));
    }

    #[test]
    fn test_sync_settings_validation() {
        let mut settings = SyncSettings::default();
        assert!(settings.validate().is_ok());
        settings.queue_size = 0;
        assert!(settings.validate().is_err());
    }
}
