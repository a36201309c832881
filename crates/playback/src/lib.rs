//! # Playback
//!
//! 回放驱动：从 RecordSource 顺序读取记录，按时间窗口过滤后送入
//! Synchronizer，并把每个 SyncTuple 按发射顺序交给 TupleSink。
//!
//! ## 状态机
//!
//! ```text
//! NotStarted -> Seeking -> Streaming -> Draining -> Finished
//! ```
//!
//! - origin 为读到的第一条记录的时间戳
//! - `window.end` 为开区间：第一条 `>= end` 的记录停止回放
//! - 任何路径（成功、取消、出错）sink 都只 finalize 一次
//!
//! ## 使用示例
//!
//! ```ignore
//! use playback::{PlaybackDriver, RgbdExport};
//!
//! let mut export = RgbdExport::new(assembler, sink);
//! let mut driver = PlaybackDriver::new(blueprint.window());
//! let stats = driver.run(&mut reader, &decoder, &mut synchronizer, &mut export)?;
//! stats.print_summary();
//! ```

mod driver;
mod sink;
mod stats;

pub use driver::{CancelFlag, PlaybackDriver, PlaybackState};
pub use sink::{RgbdExport, TupleSink};
pub use stats::PlaybackStats;
