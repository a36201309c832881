//! Export pipeline orchestrator - wires log, synchronizer and sink.
//!
//! All configuration errors (unknown stream, wrong stream type, unknown
//! format, existing destination) surface before the first record is read.

use anyhow::{Context, Result};
use contracts::{ExportBlueprint, MessageKind, RecordSource};
use exporter::{create_sink, RgbdAssembler};
use ingestion::{MessageDecoder, RecordingReader, TypeRegistry};
use playback::{CancelFlag, PlaybackDriver, PlaybackStats, RgbdExport};
use sync_engine::Synchronizer;
use tracing::info;

const IMAGE_KINDS: [MessageKind; 2] = [MessageKind::Image, MessageKind::CompressedImage];

/// One export run
pub struct ExportPipeline {
    blueprint: ExportBlueprint,
    cancel: CancelFlag,
}

impl ExportPipeline {
    pub fn new(blueprint: ExportBlueprint) -> Self {
        Self {
            blueprint,
            cancel: CancelFlag::new(),
        }
    }

    /// Flag that stops the run after the current record
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the export to completion (blocking)
    pub fn run(self) -> Result<PlaybackStats> {
        let bp = &self.blueprint;
        let selection = &bp.streams;

        let mut reader = RecordingReader::open(&bp.input.path)
            .with_context(|| format!("Failed to open log {}", bp.input.path.display()))?;

        let table = TypeRegistry::default().resolve_streams(&reader.streams());
        table.require(&selection.all())?;
        table.require_kind(&selection.colour, &IMAGE_KINDS)?;
        table.require_kind(&selection.depth, &IMAGE_KINDS)?;
        table.require_kind(&selection.info, &[MessageKind::CameraInfo])?;
        if let Some(pose) = &selection.pose {
            table.require_kind(pose, &[MessageKind::PoseStamped])?;
        }

        let format = bp.export_format()?;
        let mut synchronizer = Synchronizer::new(bp.to_sync_engine_config())
            .context("Invalid synchronizer settings")?;

        let sink = create_sink(format, &bp.export.path)
            .with_context(|| format!("Failed to create {format} sink"))?;
        let mut export = RgbdExport::new(RgbdAssembler::from_selection(selection), sink);
        let decoder = MessageDecoder::new(table);

        info!(
            log = %bp.input.path.display(),
            records = reader.len(),
            format = %format,
            export = %bp.export.path.display(),
            queue_size = bp.sync.queue_size,
            slop = bp.sync.slop,
            "Export starting"
        );

        let mut driver = PlaybackDriver::new(bp.window()).with_cancel(self.cancel.clone());
        let stats = driver
            .run(&mut reader, &decoder, &mut synchronizer, &mut export)
            .context("Export failed")?;

        Ok(stats)
    }
}
