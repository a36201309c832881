//! Tuple consumers driven by the playback loop

use contracts::{ContractError, DatasetSink, SyncTuple};
use exporter::RgbdAssembler;
use tracing::error;

/// Consumer of synchronized tuples, called in emission order
pub trait TupleSink {
    fn name(&self) -> &str;

    /// Persist one tuple
    fn accept(&mut self, tuple: SyncTuple) -> Result<(), ContractError>;

    /// Flush and close; the driver calls this exactly once per run
    fn finalize(&mut self) -> Result<(), ContractError>;
}

/// Assembles tuples into RGB-D frames and hands them to a dataset sink
pub struct RgbdExport<K> {
    assembler: RgbdAssembler,
    sink: K,
    frames_written: u64,
}

impl<K: DatasetSink> RgbdExport<K> {
    pub fn new(assembler: RgbdAssembler, sink: K) -> Self {
        Self {
            assembler,
            sink,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn into_inner(self) -> K {
        self.sink
    }
}

impl<K: DatasetSink> TupleSink for RgbdExport<K> {
    fn name(&self) -> &str {
        self.sink.name()
    }

    fn accept(&mut self, tuple: SyncTuple) -> Result<(), ContractError> {
        let result = self
            .assembler
            .assemble(&tuple)
            .and_then(|frame| self.sink.write_rgbd(&frame));

        observability::record_frame_written(self.sink.name(), result.is_ok());
        match result {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(e) => {
                error!(
                    sink = %self.sink.name(),
                    tuple_id = tuple.tuple_id,
                    error = %e,
                    "frame write failed"
                );
                Err(e)
            }
        }
    }

    fn finalize(&mut self) -> Result<(), ContractError> {
        self.sink.finalize()
    }
}
