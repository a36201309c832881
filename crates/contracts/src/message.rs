//! Typed messages carried by log records.
//!
//! 字段布局与 ROS 2 的 `sensor_msgs` / `geometry_msgs` 保持一致。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Message time stamp (seconds + nanoseconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    /// Fractional seconds
    pub fn seconds(&self) -> f64 {
        self.sec as f64 + self.nanosec as f64 * 1e-9
    }

    /// Build from integer nanoseconds
    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            sec: nanos.div_euclid(1_000_000_000) as i32,
            nanosec: nanos.rem_euclid(1_000_000_000) as u32,
        }
    }
}

/// Message header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

/// Uncompressed image (`sensor_msgs/msg/Image`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMsg {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    /// Pixel encoding, e.g. `rgb8`, `bgr8`, `16UC1`
    pub encoding: String,
    pub is_bigendian: u8,
    /// Row length in bytes
    pub step: u32,
    pub data: Bytes,
}

/// Compressed image (`sensor_msgs/msg/CompressedImage`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedImageMsg {
    pub header: Header,
    /// Format hint as published, e.g. `jpeg`, `png`; not trusted by the sinks
    pub format: String,
    pub data: Bytes,
}

/// Camera calibration (`sensor_msgs/msg/CameraInfo`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraInfoMsg {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub distortion_model: String,
    /// Distortion parameters, `plumb_bob` order: k1, k2, p1, p2, k3
    pub d: Vec<f64>,
    /// Row-major 3x3 intrinsic matrix
    pub k: [f64; 9],
    pub r: [f64; 9],
    pub p: [f64; 12],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Stamped pose (`geometry_msgs/msg/PoseStamped`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStampedMsg {
    pub header: Header,
    pub pose: Pose,
}

/// Message kinds the exporter understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Image,
    CompressedImage,
    CameraInfo,
    PoseStamped,
}

impl MessageKind {
    /// Canonical type descriptor as found in log metadata
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Image => "sensor_msgs/msg/Image",
            Self::CompressedImage => "sensor_msgs/msg/CompressedImage",
            Self::CameraInfo => "sensor_msgs/msg/CameraInfo",
            Self::PoseStamped => "geometry_msgs/msg/PoseStamped",
        }
    }
}
