//! # Sync Engine
//!
//! 多流近似时间同步器。
//!
//! 负责：
//! - 每个流一个有界队列（满则丢弃最旧）
//! - 以更新的流为锚点的最近邻匹配
//! - 容差 (slop) 判定与可选流附加
//! - 输出 `SyncTuple`
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::{Synchronizer, SyncEngineConfig};
//!
//! let config = SyncEngineConfig::new(["/rgb", "/depth", "/info"], ["/pose"])
//!     .with_queue_size(100)
//!     .with_slop(0.016);
//!
//! let mut sync = Synchronizer::new(config)?;
//!
//! // Push records as they arrive
//! if let Some(tuple) = sync.push(record)? {
//!     // Handle synchronized tuple
//! }
//! ```

mod engine;
mod queue;

pub use engine::{SyncStats, Synchronizer, TupleCallback};

// Re-exports
pub use contracts::{OrderPolicy, StreamSpec, SyncEngineConfig, SyncTuple};
