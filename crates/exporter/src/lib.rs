//! # Exporter
//!
//! 数据集导出模块。
//!
//! 负责：
//! - 把 `SyncTuple` 组装为 `RgbdFrame` (一致性检查、内参、位姿)
//! - 图像编码与格式探测
//! - 写出数据集目录 (ICL) 或仅记录日志

pub mod assemble;
pub mod factory;
pub mod image_io;
pub mod sinks;

pub use assemble::{intrinsics, pose_to_matrix, RgbdAssembler, DEPTH_ENCODINGS};
pub use contracts::{DatasetSink, RgbdFrame};
pub use factory::{create_sink, BoxedSink};
pub use image_io::{detect_format, encode_colour, encode_depth, EncodedImage};
pub use sinks::{IclSink, LogSink};
