//! LogSink - logs frame summary via tracing

use contracts::{ContractError, DatasetSink, ImagePayload, RgbdFrame};
use tracing::{info, instrument};

/// Sink that only logs frame summaries (dry run)
pub struct LogSink {
    name: String,
    frames: u64,
    finalized: bool,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            finalized: false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn log_frame_summary(&self, frame: &RgbdFrame) {
        info!(
            sink = %self.name,
            index = self.frames,
            stamp = frame.stamp,
            colour = describe(&frame.colour),
            depth = describe(&frame.depth),
            fx = frame.intrinsics.fx,
            fy = frame.intrinsics.fy,
            pose = frame.pose.is_some(),
            "RgbdFrame received"
        );
    }
}

fn describe(image: &ImagePayload) -> String {
    match image {
        ImagePayload::Pixels {
            width,
            height,
            encoding,
            ..
        } => format!("{width}x{height} {encoding}"),
        ImagePayload::Encoded { data } => format!("encoded {} bytes", data.len()),
    }
}

impl DatasetSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, index = self.frames)
    )]
    fn write_rgbd(&mut self, frame: &RgbdFrame) -> Result<(), ContractError> {
        self.log_frame_summary(frame);
        self.frames += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_finalize", skip(self))]
    fn finalize(&mut self) -> Result<(), ContractError> {
        if !self.finalized {
            self.finalized = true;
            info!(sink = %self.name, frames = self.frames, "LogSink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::Intrinsics;

    #[test]
    fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let frame = RgbdFrame {
            colour: ImagePayload::Encoded {
                data: Bytes::from_static(b"\xff\xd8"),
            },
            depth: ImagePayload::Encoded {
                data: Bytes::from_static(b"\x89PNG"),
            },
            intrinsics: Intrinsics {
                width: 640,
                height: 480,
                fx: 1.0,
                fy: 1.0,
                cx: 0.0,
                cy: 0.0,
                distortion: [0.0; 5],
            },
            stamp: 1.0,
            pose: None,
        };

        assert!(sink.write_rgbd(&frame).is_ok());
        assert_eq!(sink.frames(), 1);
        assert!(sink.finalize().is_ok());
    }

    #[test]
    fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
