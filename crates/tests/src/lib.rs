//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 录制文件 -> 回放 -> 同步 -> ICL 数据集 的端到端场景
//! - 时间窗口边界、目标路径冲突、缺失位姿、未知流等配置与一致性错误

#[cfg(test)]
mod fixtures {
    use std::path::Path;

    use contracts::{
        CameraInfoMsg, CompressedImageMsg, ContractError, Header, ImageMsg, MessageKind, Payload,
        PlaybackWindow, Point, Pose, PoseStampedMsg, Quaternion, RecordSource, StreamSelection,
        SyncEngineConfig, Time,
    };
    use exporter::{create_sink, RgbdAssembler};
    use ingestion::{MessageDecoder, RecordingReader, RecordingWriter, TypeRegistry};
    use playback::{PlaybackDriver, PlaybackStats, RgbdExport};
    use sync_engine::Synchronizer;

    pub const SEC: i64 = 1_000_000_000;
    pub const MS: i64 = 1_000_000;
    /// 2023-11-14 22:13:20 UTC
    pub const T0: i64 = 1_700_000_000 * SEC;
    pub const WIDTH: u32 = 4;
    pub const HEIGHT: u32 = 2;

    pub fn header(t: i64, frame_id: &str) -> Header {
        Header {
            stamp: Time::from_nanos(t),
            frame_id: frame_id.into(),
        }
    }

    pub fn colour(t: i64) -> Payload {
        Payload::Image(ImageMsg {
            header: header(t, "camera"),
            height: HEIGHT,
            width: WIDTH,
            encoding: "bgr8".into(),
            is_bigendian: 0,
            step: WIDTH * 3,
            data: vec![128u8; (WIDTH * HEIGHT * 3) as usize].into(),
        })
    }

    pub fn depth(t: i64, frame_id: &str) -> Payload {
        let data: Vec<u8> = (0..WIDTH * HEIGHT)
            .flat_map(|i| (1000 + i as u16).to_le_bytes())
            .collect();
        Payload::Image(ImageMsg {
            header: header(t, frame_id),
            height: HEIGHT,
            width: WIDTH,
            encoding: "16UC1".into(),
            is_bigendian: 0,
            step: WIDTH * 2,
            data: data.into(),
        })
    }

    pub fn info(t: i64) -> Payload {
        Payload::CameraInfo(CameraInfoMsg {
            header: header(t, "camera"),
            height: HEIGHT,
            width: WIDTH,
            distortion_model: "plumb_bob".into(),
            d: vec![0.1, -0.05, 0.0, 0.0, 0.01],
            k: [525.0, 0.0, 319.5, 0.0, 525.0, 239.5, 0.0, 0.0, 1.0],
            r: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            p: [0.0; 12],
        })
    }

    pub fn pose(t: i64, x: f64) -> Payload {
        Payload::Pose(PoseStampedMsg {
            header: header(t, "world"),
            pose: Pose {
                position: Point { x, y: 0.5, z: -1.0 },
                orientation: Quaternion::default(),
            },
        })
    }

    /// One frame every 500 ms for `frames` frames
    ///
    /// Per frame: colour at t, pose at t+1ms, depth at t+3ms, info at t+5ms.
    pub fn write_log(path: &Path, frames: i64, with_pose: bool) {
        let mut writer = RecordingWriter::create(path).unwrap();
        if !with_pose {
            // declared but silent
            writer.add_stream("/pose", MessageKind::PoseStamped.type_name());
        }
        for k in 0..frames {
            let t = T0 + k * 500 * MS;
            writer.write("/rgb", t, &colour(t)).unwrap();
            if with_pose {
                writer.write("/pose", t + MS, &pose(t, k as f64)).unwrap();
            }
            writer.write("/depth", t + 3 * MS, &depth(t, "camera")).unwrap();
            writer.write("/info", t + 5 * MS, &info(t)).unwrap();
        }
        writer.finish().unwrap();
    }

    pub fn selection(with_pose: bool) -> StreamSelection {
        StreamSelection {
            colour: "/rgb".into(),
            depth: "/depth".into(),
            info: "/info".into(),
            pose: with_pose.then(|| "/pose".to_string()),
        }
    }

    /// Same wiring as the CLI export command
    pub fn export(
        log: &Path,
        out: &Path,
        selection: &StreamSelection,
        window: PlaybackWindow,
    ) -> Result<PlaybackStats, ContractError> {
        let mut reader = RecordingReader::open(log)?;
        let table = TypeRegistry::default().resolve_streams(&reader.streams());
        table.require(&selection.all())?;
        let config = SyncEngineConfig::new(
            selection.required(),
            selection.pose.iter().map(String::as_str),
        );
        let mut synchronizer = Synchronizer::new(config)?;

        let sink = create_sink(contracts::ExportFormat::Icl, out)?;
        let mut export = RgbdExport::new(RgbdAssembler::from_selection(selection), sink);
        let decoder = MessageDecoder::new(table);

        PlaybackDriver::new(window).run(&mut reader, &decoder, &mut synchronizer, &mut export)
    }

    /// Colour blob already encoded by the camera driver
    pub fn compressed_colour(t: i64) -> Payload {
        let Payload::Image(img) = colour(t) else {
            unreachable!()
        };
        let encoded = exporter::encode_colour(&contracts::ImagePayload::Pixels {
            width: img.width,
            height: img.height,
            encoding: "bgr8".into(),
            step: img.step,
            big_endian: false,
            data: img.data,
        })
        .unwrap();
        Payload::CompressedImage(CompressedImageMsg {
            header: img.header,
            format: "jpeg".into(),
            data: encoded.data.into(),
        })
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, MessageKind, PlaybackWindow, RecordSource};
    use ingestion::{RecordingReader, RecordingWriter};
    use tempfile::tempdir;

    use super::fixtures::*;

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    /// End-to-end: RecordingWriter -> RecordingReader -> Synchronizer -> IclSink
    #[test]
    fn test_e2e_full_export() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 6, true);

        let stats = export(&log, &out, &selection(true), PlaybackWindow::unbounded()).unwrap();

        assert_eq!(stats.tuples_written, 6);
        assert_eq!(stats.sync.records_dropped, 0);
        assert_eq!(count_files(&out.join("rgb")), 6);
        assert_eq!(count_files(&out.join("depth")), 6);
        assert!(out
            .join("rgb")
            .join("frame_20231114_221320_000000_0.jpg")
            .is_file());
        assert!(out
            .join("depth")
            .join("20231114_221322_500000_5.png")
            .is_file());

        let yaml: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(out.join("icl.yaml")).unwrap()).unwrap();
        assert_eq!(yaml["dataset_name"].as_str(), Some("icl"));
        let params = &yaml["camera_params"];
        assert_eq!(params["fx"].as_f64(), Some(525.0));
        assert_eq!(params["cx"].as_f64(), Some(319.5));
        assert_eq!(params["cy"].as_f64(), Some(239.5));
        assert_eq!(params["image_width"].as_u64(), Some(WIDTH as u64));
        assert_eq!(params["image_height"].as_u64(), Some(HEIGHT as u64));
        assert_eq!(params["png_depth_scale"].as_u64(), Some(1000));
        assert_eq!(params["distortion"][0].as_f64(), Some(0.1));

        let poses = fs::read_to_string(out.join("poses.gt.sim")).unwrap();
        assert_eq!(poses.matches("\n\n").count(), 6);
    }

    #[test]
    fn test_e2e_pose_file_format() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 2, true);

        export(&log, &out, &selection(true), PlaybackWindow::unbounded()).unwrap();

        let poses = fs::read_to_string(out.join("poses.gt.sim")).unwrap();
        assert_eq!(
            poses,
            "1.000000 0.000000 0.000000 0.000000\n\
             0.000000 1.000000 0.000000 0.500000\n\
             0.000000 0.000000 1.000000 -1.000000\n\
             \n\
             1.000000 0.000000 0.000000 1.000000\n\
             0.000000 1.000000 0.000000 0.500000\n\
             0.000000 0.000000 1.000000 -1.000000\n\
             \n"
        );
    }

    /// [5.0, 10.0): frames at 5.0 .. 9.5 s, nothing before, stop at 10.0 s
    #[test]
    fn test_e2e_window_boundary() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 30, true);

        let stats = export(
            &log,
            &out,
            &selection(true),
            PlaybackWindow::between(5.0, 10.0),
        )
        .unwrap();

        assert_eq!(stats.origin_ns, Some(T0));
        assert_eq!(stats.seeks, 1);
        assert_eq!(stats.tuples_written, 10);
        // 10 frames x 4 streams
        assert_eq!(stats.records_inserted, 40);
        assert!(stats.last_normalized_ns.unwrap() < 10 * SEC);

        let mut names: Vec<String> = fs::read_dir(out.join("rgb"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.first().unwrap(), "frame_20231114_221325_000000_0.jpg");
        assert_eq!(names.last().unwrap(), "frame_20231114_221329_500000_9.jpg");
    }

    #[test]
    fn test_e2e_missing_optional_pose() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 4, false);

        let stats = export(&log, &out, &selection(true), PlaybackWindow::unbounded()).unwrap();

        assert_eq!(stats.tuples_written, 4);
        assert_eq!(stats.tuple_metrics.member_counts.get("/pose"), None);
        assert_eq!(fs::read_to_string(out.join("poses.gt.sim")).unwrap(), "");
    }

    #[test]
    fn test_e2e_destination_collision() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 2, true);
        fs::create_dir(&out).unwrap();

        let err = export(&log, &out, &selection(true), PlaybackWindow::unbounded()).unwrap_err();

        assert!(matches!(err, ContractError::DestinationExists { .. }));
        assert_eq!(count_files(&out), 0);
    }

    #[test]
    fn test_e2e_unknown_topic() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 2, true);

        let mut sel = selection(true);
        sel.depth = "/camera/depth".into();
        let err = export(&log, &out, &sel, PlaybackWindow::unbounded()).unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, ContractError::UnknownStream { .. }));
        assert!(message.contains("/camera/depth"), "got: {message}");
        assert!(message.contains("/rgb"), "got: {message}");
        assert!(!out.exists());
    }

    #[test]
    fn test_e2e_frame_id_mismatch_is_fatal() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");

        let mut writer = RecordingWriter::create(&log).unwrap();
        for k in 0..3 {
            let t = T0 + k * 500 * MS;
            let frame_id = if k == 1 { "other_camera" } else { "camera" };
            writer.write("/rgb", t, &colour(t)).unwrap();
            writer.write("/depth", t + 3 * MS, &depth(t, frame_id)).unwrap();
            writer.write("/info", t + 5 * MS, &info(t)).unwrap();
        }
        writer.finish().unwrap();

        let err = export(&log, &out, &selection(false), PlaybackWindow::unbounded()).unwrap_err();

        assert!(matches!(err, ContractError::Consistency { .. }));
        // partial output is kept, the run is not reported as success
        assert_eq!(count_files(&out.join("rgb")), 1);
        assert!(out.join("poses.gt.sim").is_file());
    }

    #[test]
    fn test_e2e_compressed_colour_passthrough() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");

        let mut writer = RecordingWriter::create(&log).unwrap();
        let t = T0;
        writer.write("/rgb", t, &compressed_colour(t)).unwrap();
        writer.write("/depth", t + 3 * MS, &depth(t, "camera")).unwrap();
        writer.write("/info", t + 5 * MS, &info(t)).unwrap();
        writer.finish().unwrap();

        let reader = RecordingReader::open(&log).unwrap();
        let kinds: Vec<_> = reader.streams().into_iter().map(|s| s.type_name).collect();
        assert!(kinds.contains(&MessageKind::CompressedImage.type_name().to_string()));

        let stats = export(&log, &out, &selection(false), PlaybackWindow::unbounded()).unwrap();
        assert_eq!(stats.tuples_written, 1);
        assert!(out
            .join("rgb")
            .join("frame_20231114_221320_000000_0.jpg")
            .is_file());
    }

    #[test]
    fn test_e2e_undetectable_blob_is_format_error() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");

        let mut writer = RecordingWriter::create(&log).unwrap();
        let t = T0;
        let contracts::Payload::CompressedImage(mut msg) = compressed_colour(t) else {
            unreachable!()
        };
        msg.data = Bytes::from_static(b"definitely not an image");
        writer
            .write("/rgb", t, &contracts::Payload::CompressedImage(msg))
            .unwrap();
        writer.write("/depth", t + 3 * MS, &depth(t, "camera")).unwrap();
        writer.write("/info", t + 5 * MS, &info(t)).unwrap();
        writer.finish().unwrap();

        let err = export(&log, &out, &selection(false), PlaybackWindow::unbounded()).unwrap_err();
        assert!(matches!(err, ContractError::Format { .. }));
        assert_eq!(count_files(&out.join("rgb")), 0);
    }

    #[test]
    fn test_e2e_job_file_drives_export() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 12, true);

        let job = format!(
            r#"
[input]
path = "{}"

[streams]
colour = "/rgb"
depth = "/depth"
info = "/info"
pose = "/pose"

[sync]
queue_size = 4
slop = 0.016

[range]
start = 2.0
end = 4.0

[export]
format = "ICL"
path = "{}"
"#,
            log.display(),
            out.display()
        );
        let bp = ConfigLoader::load_from_str(&job, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.to_sync_engine_config().queue_size, 4);

        let stats = export(&bp.input.path, &bp.export.path, &bp.streams, bp.window()).unwrap();
        // 2.0, 2.5, 3.0, 3.5
        assert_eq!(stats.tuples_written, 4);
    }

    /// Tight slop: depth 3 ms and info 5 ms behind colour never match
    #[test]
    fn test_e2e_slop_too_tight_writes_nothing() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("log");
        let out = dir.path().join("dataset");
        write_log(&log, 3, false);

        let mut reader = RecordingReader::open(&log).unwrap();
        let table = ingestion::TypeRegistry::default().resolve_streams(&reader.streams());
        let mut synchronizer = sync_engine::Synchronizer::new(
            contracts::SyncEngineConfig::new(["/rgb", "/depth", "/info"], Vec::<&str>::new())
                .with_slop(0.001),
        )
        .unwrap();
        let sink = exporter::create_sink(contracts::ExportFormat::Icl, &out).unwrap();
        let mut export = playback::RgbdExport::new(
            exporter::RgbdAssembler::from_selection(&selection(false)),
            sink,
        );

        let stats = playback::PlaybackDriver::new(PlaybackWindow::unbounded())
            .run(
                &mut reader,
                &ingestion::MessageDecoder::new(table),
                &mut synchronizer,
                &mut export,
            )
            .unwrap();

        assert_eq!(stats.tuples_written, 0);
        assert_eq!(export.frames_written(), 0);
        assert!(!out.join("icl.yaml").exists());
    }
}
