//! RecordingWriter - produces the recording directory layout

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::Payload;
use tracing::debug;

use crate::decoder::encode_payload;
use crate::error::{IngestionError, Result};
use crate::format::{
    IndexEntry, Manifest, ManifestStream, FORMAT_VERSION, INDEX_FILE, MANIFEST_FILE, PAYLOAD_FILE,
};

/// Append-only writer; records must be written in non-decreasing time order
pub struct RecordingWriter {
    root: PathBuf,
    streams: Vec<ManifestStream>,
    index: BufWriter<File>,
    payload: BufWriter<File>,
    offset: u64,
    records: usize,
    last_ns: Option<i64>,
}

impl RecordingWriter {
    /// Create the recording directory (and parents)
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;

        Ok(Self {
            index: BufWriter::new(File::create(root.join(INDEX_FILE))?),
            payload: BufWriter::new(File::create(root.join(PAYLOAD_FILE))?),
            root,
            streams: Vec::new(),
            offset: 0,
            records: 0,
            last_ns: None,
        })
    }

    /// Declare a stream; re-declaring keeps the first type
    pub fn add_stream(&mut self, name: impl Into<String>, type_name: impl Into<String>) {
        let name = name.into();
        if !self.streams.iter().any(|s| s.name == name) {
            self.streams.push(ManifestStream {
                name,
                type_name: type_name.into(),
            });
        }
    }

    /// Append raw bytes to a declared stream
    pub fn write_raw(&mut self, stream: &str, timestamp_ns: i64, data: &[u8]) -> Result<()> {
        if !self.streams.iter().any(|s| s.name == stream) {
            return Err(IngestionError::UndeclaredStream {
                line: self.records + 1,
                stream: stream.to_string(),
            });
        }
        if let Some(last_ns) = self.last_ns {
            if timestamp_ns < last_ns {
                return Err(IngestionError::NonMonotonic {
                    timestamp_ns,
                    last_ns,
                });
            }
        }

        self.payload.write_all(data)?;
        let entry = IndexEntry {
            stream: stream.to_string(),
            timestamp_ns,
            offset: self.offset,
            len: data.len() as u64,
        };
        serde_json::to_writer(&mut self.index, &entry)
            .map_err(|e| IngestionError::Encode(e.to_string()))?;
        self.index.write_all(b"\n")?;

        self.offset += data.len() as u64;
        self.records += 1;
        self.last_ns = Some(timestamp_ns);
        Ok(())
    }

    /// Encode and append a typed payload
    ///
    /// Streams are declared on first use from the payload's message kind.
    pub fn write(&mut self, stream: &str, timestamp_ns: i64, payload: &Payload) -> Result<()> {
        let (kind, bytes) = encode_payload(payload)?;
        if let Some(kind) = kind {
            self.add_stream(stream, kind.type_name());
        }
        self.write_raw(stream, timestamp_ns, &bytes)
    }

    /// Flush data files and write the manifest
    pub fn finish(mut self) -> Result<PathBuf> {
        self.index.flush()?;
        self.payload.flush()?;

        let manifest = Manifest {
            version: FORMAT_VERSION,
            streams: std::mem::take(&mut self.streams),
        };
        let mut file = BufWriter::new(File::create(self.root.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut file, &manifest)
            .map_err(|e| IngestionError::Encode(e.to_string()))?;
        file.flush()?;

        debug!(
            path = %self.root.display(),
            records = self.records,
            bytes = self.offset,
            "recording written"
        );
        Ok(self.root)
    }
}
