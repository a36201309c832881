//! Ingestion 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 录制目录缺少必要文件
    #[error("recording '{}' is missing {file}", .path.display())]
    MissingFile {
        /// 录制目录
        path: PathBuf,
        /// 缺失的文件名
        file: &'static str,
    },

    /// manifest 解析失败
    #[error("invalid manifest: {message}")]
    Manifest {
        /// 错误消息
        message: String,
    },

    /// 索引行解析失败
    #[error("invalid index entry at line {line}: {message}")]
    Index {
        /// 行号 (从 1 开始)
        line: usize,
        /// 错误消息
        message: String,
    },

    /// 索引引用了 manifest 中不存在的流
    #[error("index line {line} references undeclared stream '{stream}'")]
    UndeclaredStream {
        /// 行号
        line: usize,
        /// 流名称
        stream: String,
    },

    /// 索引区间超出 payload 文件
    #[error("record on '{stream}' at offset {offset} (+{len}) exceeds payload size {size}")]
    PayloadOutOfBounds {
        /// 流名称
        stream: String,
        /// 偏移
        offset: u64,
        /// 长度
        len: u64,
        /// payload 文件大小
        size: u64,
    },

    /// 写入时间戳倒退
    #[error("record at {timestamp_ns}ns precedes previous record at {last_ns}ns")]
    NonMonotonic {
        /// 新记录时间戳
        timestamp_ns: i64,
        /// 上一条记录时间戳
        last_ns: i64,
    },

    /// 序列化失败
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::Io(e) => ContractError::Io(e),
            IngestionError::MissingFile { .. } | IngestionError::Manifest { .. } => {
                ContractError::config_parse(err.to_string())
            }
            other => ContractError::Other(other.to_string()),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
