//! RgbdFrame - input of a dataset sink
//!
//! One assembled colour/depth pair with calibration and optional pose.

use bytes::Bytes;

/// Image handed to a sink: either a pixel array or an already-encoded blob
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Raw pixel array
    Pixels {
        width: u32,
        height: u32,
        /// Pixel encoding (`rgb8`, `bgr8`, `16UC1`, ...)
        encoding: String,
        /// Row length in bytes
        step: u32,
        big_endian: bool,
        data: Bytes,
    },
    /// Encoded bytes (JPEG/PNG/...); the sink detects the format from content
    Encoded { data: Bytes },
}

impl ImagePayload {
    /// Dimensions of pixel arrays; `None` for encoded blobs (unknown until probed)
    pub fn pixel_dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Pixels { width, height, .. } => Some((*width, *height)),
            Self::Encoded { .. } => None,
        }
    }
}

/// Pinhole intrinsics with OpenCV-ordered distortion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// k1, k2, p1, p2, k3
    pub distortion: [f64; 5],
}

/// Row-major 3x4 `[R | t]` camera pose
pub type PoseMatrix = [[f64; 4]; 3];

/// One frame ready to be persisted
#[derive(Debug, Clone)]
pub struct RgbdFrame {
    pub colour: ImagePayload,
    pub depth: ImagePayload,
    pub intrinsics: Intrinsics,
    /// Frame time in seconds (colour header stamp)
    pub stamp: f64,
    pub pose: Option<PoseMatrix>,
}
