//! SyncTuple -> RgbdFrame
//!
//! 检查跨流一致性 (frame_id、深度编码)，提取内参并把位姿转换为 3x4 矩阵。

use contracts::{
    CameraInfoMsg, ContractError, Header, ImagePayload, Intrinsics, Payload, Pose, PoseMatrix,
    Record, RgbdFrame, StreamId, StreamSelection, SyncTuple,
};
use nalgebra::{Quaternion as NQuaternion, UnitQuaternion};
use tracing::trace;

/// Pixel encodings accepted for depth images
pub const DEPTH_ENCODINGS: [&str; 2] = ["16UC1", "mono16"];

/// Builds sink input from synchronized tuples
#[derive(Debug, Clone)]
pub struct RgbdAssembler {
    colour: StreamId,
    depth: StreamId,
    info: StreamId,
    pose: Option<StreamId>,
}

impl RgbdAssembler {
    pub fn new(
        colour: impl Into<StreamId>,
        depth: impl Into<StreamId>,
        info: impl Into<StreamId>,
        pose: Option<StreamId>,
    ) -> Self {
        Self {
            colour: colour.into(),
            depth: depth.into(),
            info: info.into(),
            pose,
        }
    }

    pub fn from_selection(selection: &StreamSelection) -> Self {
        Self::new(
            selection.colour.as_str(),
            selection.depth.as_str(),
            selection.info.as_str(),
            selection.pose.as_deref().map(StreamId::from),
        )
    }

    /// Turn one tuple into a frame
    ///
    /// # Errors
    /// `Consistency` if a member is missing or has the wrong payload, if the
    /// frame ids differ or if the depth encoding is not 16-bit.
    pub fn assemble(&self, tuple: &SyncTuple) -> Result<RgbdFrame, ContractError> {
        let colour_rec = self.member(tuple, &self.colour)?;
        let depth_rec = self.member(tuple, &self.depth)?;
        let info_rec = self.member(tuple, &self.info)?;

        let (colour_header, colour) = image_payload(colour_rec)?;
        let (depth_header, depth) = image_payload(depth_rec)?;
        let info = match &info_rec.payload {
            Payload::CameraInfo(msg) => msg,
            other => return Err(unexpected_payload(info_rec, other, "camera info")),
        };

        if colour_header.frame_id != depth_header.frame_id
            || colour_header.frame_id != info.header.frame_id
        {
            return Err(ContractError::consistency(format!(
                "frame ids differ: colour '{}', depth '{}', info '{}'",
                colour_header.frame_id, depth_header.frame_id, info.header.frame_id
            )));
        }

        if let ImagePayload::Pixels { encoding, .. } = &depth {
            if !DEPTH_ENCODINGS.contains(&encoding.as_str()) {
                return Err(ContractError::consistency(format!(
                    "depth encoding '{encoding}' is not 16-bit ({})",
                    DEPTH_ENCODINGS.join(", ")
                )));
            }
        }

        if let (Some(c), Some(d)) = (colour.pixel_dimensions(), depth.pixel_dimensions()) {
            if c != d {
                return Err(ContractError::consistency(format!(
                    "colour is {}x{} but depth is {}x{}",
                    c.0, c.1, d.0, d.1
                )));
            }
        }

        let pose = match &self.pose {
            Some(stream) => match tuple.record(stream) {
                Some(rec) => match &rec.payload {
                    Payload::Pose(msg) => Some(pose_to_matrix(&msg.pose)?),
                    other => return Err(unexpected_payload(rec, other, "pose")),
                },
                None => None,
            },
            None => None,
        };

        trace!(tuple_id = tuple.tuple_id, has_pose = pose.is_some(), "tuple assembled");
        Ok(RgbdFrame {
            stamp: colour_header.stamp.seconds(),
            colour,
            depth,
            intrinsics: intrinsics(info),
            pose,
        })
    }

    fn member<'a>(&self, tuple: &'a SyncTuple, stream: &StreamId) -> Result<&'a Record, ContractError> {
        tuple.record(stream).ok_or_else(|| {
            ContractError::consistency(format!(
                "tuple {} has no record for '{stream}'",
                tuple.tuple_id
            ))
        })
    }
}

fn unexpected_payload(rec: &Record, payload: &Payload, expected: &str) -> ContractError {
    ContractError::consistency(format!(
        "stream '{}' carries {}, expected {expected}",
        rec.stream,
        payload.kind_name()
    ))
}

fn image_payload(rec: &Record) -> Result<(&Header, ImagePayload), ContractError> {
    match &rec.payload {
        Payload::Image(msg) => Ok((
            &msg.header,
            ImagePayload::Pixels {
                width: msg.width,
                height: msg.height,
                encoding: msg.encoding.clone(),
                step: msg.step,
                big_endian: msg.is_bigendian != 0,
                data: msg.data.clone(),
            },
        )),
        Payload::CompressedImage(msg) => Ok((
            &msg.header,
            ImagePayload::Encoded {
                data: msg.data.clone(),
            },
        )),
        other => Err(unexpected_payload(rec, other, "an image")),
    }
}

/// K (row-major 3x3) and D (k1, k2, p1, p2, k3) to intrinsics
pub fn intrinsics(info: &CameraInfoMsg) -> Intrinsics {
    let mut distortion = [0.0; 5];
    for (dst, src) in distortion.iter_mut().zip(&info.d) {
        *dst = *src;
    }

    Intrinsics {
        width: info.width,
        height: info.height,
        fx: info.k[0],
        fy: info.k[4],
        cx: info.k[2],
        cy: info.k[5],
        distortion,
    }
}

/// Pose to row-major `[R | t]`; the quaternion is normalized first
pub fn pose_to_matrix(pose: &Pose) -> Result<PoseMatrix, ContractError> {
    let q = pose.orientation;
    let raw = NQuaternion::new(q.w, q.x, q.y, q.z);
    let norm = raw.norm();
    if !norm.is_finite() || norm == 0.0 {
        return Err(ContractError::consistency(format!(
            "pose orientation is not a valid rotation (norm {norm})"
        )));
    }

    let rotation = UnitQuaternion::from_quaternion(raw).to_rotation_matrix();
    let m = rotation.matrix();
    let t = [pose.position.x, pose.position.y, pose.position.z];

    let mut out = [[0.0; 4]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        *row = [m[(i, 0)], m[(i, 1)], m[(i, 2)], t[i]];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{CompressedImageMsg, ImageMsg, Point, PoseStampedMsg, Quaternion, Time};

    fn header(frame_id: &str, sec: i32) -> Header {
        Header {
            stamp: Time {
                sec,
                nanosec: 500_000_000,
            },
            frame_id: frame_id.into(),
        }
    }

    fn image(frame_id: &str, encoding: &str, bpp: u32) -> Payload {
        Payload::Image(ImageMsg {
            header: header(frame_id, 10),
            height: 2,
            width: 3,
            encoding: encoding.into(),
            is_bigendian: 0,
            step: 3 * bpp,
            data: Bytes::from(vec![0u8; (6 * bpp) as usize]),
        })
    }

    fn info(frame_id: &str) -> Payload {
        Payload::CameraInfo(CameraInfoMsg {
            header: header(frame_id, 10),
            height: 2,
            width: 3,
            distortion_model: "plumb_bob".into(),
            d: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            k: [500.0, 0.0, 320.0, 0.0, 510.0, 240.0, 0.0, 0.0, 1.0],
            r: [0.0; 9],
            p: [0.0; 12],
        })
    }

    fn tuple(records: Vec<Record>) -> SyncTuple {
        SyncTuple {
            tuple_id: 1,
            t_sync_ns: 0,
            spread_ns: 0,
            records,
        }
    }

    fn assembler() -> RgbdAssembler {
        RgbdAssembler::new("/rgb", "/depth", "/info", Some(StreamId::from("/pose")))
    }

    #[test]
    fn test_assemble_pixels() {
        let t = tuple(vec![
            Record::new("/rgb", 0, image("cam", "rgb8", 3)),
            Record::new("/depth", 0, image("cam", "16UC1", 2)),
            Record::new("/info", 0, info("cam")),
        ]);

        let frame = assembler().assemble(&t).unwrap();
        assert_eq!(frame.stamp, 10.5);
        assert!(frame.pose.is_none());
        assert_eq!(frame.intrinsics.fx, 500.0);
        assert_eq!(frame.intrinsics.fy, 510.0);
        assert_eq!(frame.intrinsics.cx, 320.0);
        assert_eq!(frame.intrinsics.cy, 240.0);
        assert_eq!(frame.intrinsics.distortion, [0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_short_distortion_is_padded() {
        let Payload::CameraInfo(mut msg) = info("cam") else {
            unreachable!()
        };
        msg.d = vec![0.1, 0.2];
        assert_eq!(intrinsics(&msg).distortion, [0.1, 0.2, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_frame_id_mismatch() {
        let t = tuple(vec![
            Record::new("/rgb", 0, image("cam", "rgb8", 3)),
            Record::new("/depth", 0, image("other", "16UC1", 2)),
            Record::new("/info", 0, info("cam")),
        ]);
        let err = assembler().assemble(&t).unwrap_err();
        assert!(matches!(err, ContractError::Consistency { .. }));
    }

    #[test]
    fn test_depth_must_be_16_bit() {
        let t = tuple(vec![
            Record::new("/rgb", 0, image("cam", "rgb8", 3)),
            Record::new("/depth", 0, image("cam", "32FC1", 4)),
            Record::new("/info", 0, info("cam")),
        ]);
        let err = assembler().assemble(&t).unwrap_err();
        assert!(err.to_string().contains("32FC1"));
    }

    #[test]
    fn test_compressed_colour_and_pose() {
        let colour = Payload::CompressedImage(CompressedImageMsg {
            header: header("cam", 10),
            format: "jpeg".into(),
            data: Bytes::from_static(b"\xff\xd8\xff"),
        });
        let pose = Payload::Pose(PoseStampedMsg {
            header: header("map", 10),
            pose: Pose {
                position: Point {
                    x: 1.0,
                    y: 2.0,
                    z: 3.0,
                },
                orientation: Quaternion::default(),
            },
        });
        let t = tuple(vec![
            Record::new("/rgb", 0, colour),
            Record::new("/depth", 0, image("cam", "mono16", 2)),
            Record::new("/info", 0, info("cam")),
            Record::new("/pose", 0, pose),
        ]);

        let frame = assembler().assemble(&t).unwrap();
        assert!(matches!(frame.colour, ImagePayload::Encoded { .. }));
        assert_eq!(
            frame.pose.unwrap(),
            [
                [1.0, 0.0, 0.0, 1.0],
                [0.0, 1.0, 0.0, 2.0],
                [0.0, 0.0, 1.0, 3.0]
            ]
        );
    }

    #[test]
    fn test_pose_rotation_normalized() {
        // 90 degrees about z, deliberately scaled by 2
        let s = std::f64::consts::FRAC_1_SQRT_2 * 2.0;
        let pose = Pose {
            position: Point::default(),
            orientation: Quaternion {
                x: 0.0,
                y: 0.0,
                z: s,
                w: s,
            },
        };
        let m = pose_to_matrix(&pose).unwrap();
        assert!((m[0][0]).abs() < 1e-12);
        assert!((m[0][1] + 1.0).abs() < 1e-12);
        assert!((m[1][0] - 1.0).abs() < 1e-12);
        assert!((m[2][2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let pose = Pose {
            position: Point::default(),
            orientation: Quaternion {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 0.0,
            },
        };
        assert!(pose_to_matrix(&pose).is_err());
    }

    #[test]
    fn test_missing_member() {
        let t = tuple(vec![Record::new("/rgb", 0, image("cam", "rgb8", 3))]);
        let err = assembler().assemble(&t).unwrap_err();
        assert!(err.to_string().contains("/depth"));
    }
}
