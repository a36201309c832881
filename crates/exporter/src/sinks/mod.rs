//! Dataset sink implementations

mod icl;
mod log;

pub use icl::{
    format_pose, stamp_string, IclSink, CALIBRATION_FILE, COLOUR_DIR, DEPTH_DIR, PNG_DEPTH_SCALE,
    POSES_FILE,
};
pub use log::LogSink;
