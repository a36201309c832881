//! IclSink - ICL-NUIM style RGB-D dataset
//!
//! ```text
//! <root>/
//!   rgb/frame_<stamp>.jpg
//!   depth/<stamp>.png
//!   icl.yaml
//!   poses.gt.sim
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use contracts::{ContractError, DatasetSink, Intrinsics, PoseMatrix, RgbdFrame};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::image_io::{self, EncodedImage};

pub const COLOUR_DIR: &str = "rgb";
pub const DEPTH_DIR: &str = "depth";
pub const CALIBRATION_FILE: &str = "icl.yaml";
pub const POSES_FILE: &str = "poses.gt.sim";

/// Depth PNG units per metre
pub const PNG_DEPTH_SCALE: u32 = 1000;

/// `icl.yaml` content; fields are declared in sorted order
#[derive(Debug, Serialize)]
struct IclCalibration {
    camera_params: CameraParams,
    dataset_name: &'static str,
}

#[derive(Debug, Serialize)]
struct CameraParams {
    cx: f64,
    cy: f64,
    distortion: [f64; 5],
    fx: f64,
    fy: f64,
    image_height: u32,
    image_width: u32,
    png_depth_scale: u32,
}

/// Sink writing the ICL directory layout
pub struct IclSink {
    name: String,
    root: PathBuf,
    colour_dir: PathBuf,
    depth_dir: PathBuf,
    /// `None` once finalized
    poses: Option<BufWriter<File>>,
    frames_written: u64,
}

impl IclSink {
    /// Create the dataset directory
    ///
    /// # Errors
    /// `DestinationExists` if `path` exists already, `Io` on filesystem failures
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let root = path.as_ref().to_path_buf();
        if root.exists() {
            return Err(ContractError::DestinationExists { path: root });
        }

        let colour_dir = root.join(COLOUR_DIR);
        let depth_dir = root.join(DEPTH_DIR);
        fs::create_dir_all(&colour_dir)?;
        fs::create_dir_all(&depth_dir)?;
        let poses = BufWriter::new(File::create(root.join(POSES_FILE))?);

        info!(path = %root.display(), "ICL dataset created");
        Ok(Self {
            name: "icl".to_string(),
            root,
            colour_dir,
            depth_dir,
            poses: Some(poses),
            frames_written: 0,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_frame(&mut self, frame: &RgbdFrame) -> Result<(), ContractError> {
        if self.poses.is_none() {
            return Err(ContractError::sink_write(&self.name, "sink already finalized"));
        }

        let colour = image_io::encode_colour(&frame.colour)?;
        let depth = image_io::encode_depth(&frame.depth)?;
        if colour.dimensions() != depth.dimensions() {
            return Err(ContractError::consistency(format!(
                "colour is {:?} but depth is {:?}",
                colour.dimensions(),
                depth.dimensions()
            )));
        }

        let stamp = stamp_string(frame.stamp, self.frames_written)?;
        write_file(
            &self.colour_dir.join(format!("frame_{stamp}.{}", colour.extension())),
            &colour,
        )?;
        write_file(&self.depth_dir.join(format!("{stamp}.png")), &depth)?;

        if self.frames_written == 0 {
            self.write_calibration(&frame.intrinsics, colour.dimensions())?;
        }

        if let Some(pose) = &frame.pose {
            self.append_pose(pose)?;
        }

        self.frames_written += 1;
        metrics::counter!("exporter_frames_written_total", "sink" => self.name.clone())
            .increment(1);
        metrics::counter!("exporter_bytes_written_total", "sink" => self.name.clone())
            .increment((colour.data.len() + depth.data.len()) as u64);
        debug!(stamp = %stamp, pose = frame.pose.is_some(), "frame written");
        Ok(())
    }

    fn write_calibration(
        &self,
        intrinsics: &Intrinsics,
        (width, height): (u32, u32),
    ) -> Result<(), ContractError> {
        let calibration = IclCalibration {
            camera_params: CameraParams {
                cx: intrinsics.cx,
                cy: intrinsics.cy,
                distortion: intrinsics.distortion,
                fx: intrinsics.fx,
                fy: intrinsics.fy,
                image_height: height,
                image_width: width,
                png_depth_scale: PNG_DEPTH_SCALE,
            },
            dataset_name: "icl",
        };

        let yaml = serde_yaml::to_string(&calibration)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        fs::write(self.root.join(CALIBRATION_FILE), yaml)?;
        debug!(width, height, "calibration written");
        Ok(())
    }

    fn append_pose(&mut self, pose: &PoseMatrix) -> Result<(), ContractError> {
        let Some(out) = self.poses.as_mut() else {
            return Ok(());
        };
        out.write_all(format_pose(pose).as_bytes())?;
        Ok(())
    }
}

fn write_file(path: &Path, image: &EncodedImage) -> Result<(), ContractError> {
    fs::write(path, &image.data).map_err(|e| {
        error!(path = %path.display(), error = %e, "image write failed");
        ContractError::Io(e)
    })
}

/// `YYYYmmdd_HHMMSS_ffffff_<index>` in UTC, microsecond precision
pub fn stamp_string(stamp: f64, index: u64) -> Result<String, ContractError> {
    let micros = (stamp * 1e6).round();
    let time = (micros.is_finite())
        .then(|| DateTime::<Utc>::from_timestamp_micros(micros as i64))
        .flatten()
        .ok_or_else(|| ContractError::consistency(format!("frame stamp {stamp} out of range")))?;
    Ok(format!("{}_{index}", time.format("%Y%m%d_%H%M%S_%6f")))
}

/// Three rows of `[R | t]` followed by a blank separator line
pub fn format_pose(pose: &PoseMatrix) -> String {
    let mut out = String::new();
    for row in pose {
        out.push_str(&format!(
            "{:.6} {:.6} {:.6} {:.6}\n",
            row[0], row[1], row[2], row[3]
        ));
    }
    out.push('\n');
    out
}

impl DatasetSink for IclSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "icl_sink_write",
        skip(self, frame),
        fields(sink = %self.name, index = self.frames_written)
    )]
    fn write_rgbd(&mut self, frame: &RgbdFrame) -> Result<(), ContractError> {
        self.write_frame(frame)
    }

    #[instrument(name = "icl_sink_finalize", skip(self))]
    fn finalize(&mut self) -> Result<(), ContractError> {
        let Some(mut poses) = self.poses.take() else {
            return Ok(());
        };
        poses.flush()?;
        info!(
            sink = %self.name,
            path = %self.root.display(),
            frames = self.frames_written,
            "ICL dataset finalized"
        );
        Ok(())
    }
}
