//! RecordingReader - RecordSource over a recording directory

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use contracts::{ContractError, RawRecord, RecordSource, StreamDescriptor, StreamId};
use tracing::{debug, info, instrument};

use crate::error::{IngestionError, Result};
use crate::format::{IndexEntry, Manifest, FORMAT_VERSION, INDEX_FILE, MANIFEST_FILE, PAYLOAD_FILE};

/// Sequential reader for a recording directory
///
/// The whole index is loaded on open; payload bytes are read on demand.
pub struct RecordingReader {
    root: PathBuf,
    streams: Vec<StreamDescriptor>,
    index: Vec<IndexEntry>,
    /// Positions in `index` that pass the stream filter
    selected: Vec<usize>,
    /// Next position in `selected`
    cursor: usize,
    payload: File,
}

impl std::fmt::Debug for RecordingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingReader")
            .field("root", &self.root)
            .field("streams", &self.streams.len())
            .field("records", &self.index.len())
            .field("selected", &self.selected.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

fn require_file(root: &Path, file: &'static str) -> Result<PathBuf> {
    let path = root.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(IngestionError::MissingFile {
            path: root.to_path_buf(),
            file,
        })
    }
}

impl RecordingReader {
    /// Open a recording directory
    #[instrument(name = "recording_open", skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let manifest_path = require_file(&root, MANIFEST_FILE)?;
        let index_path = require_file(&root, INDEX_FILE)?;
        let payload_path = require_file(&root, PAYLOAD_FILE)?;

        let manifest: Manifest = serde_json::from_reader(BufReader::new(File::open(manifest_path)?))
            .map_err(|e| IngestionError::Manifest {
                message: e.to_string(),
            })?;
        if manifest.version > FORMAT_VERSION {
            return Err(IngestionError::Manifest {
                message: format!(
                    "unsupported version {} (max {})",
                    manifest.version, FORMAT_VERSION
                ),
            });
        }

        let streams: Vec<StreamDescriptor> = manifest
            .streams
            .iter()
            .map(|s| StreamDescriptor {
                name: StreamId::from(s.name.as_str()),
                type_name: s.type_name.clone(),
            })
            .collect();

        let payload = File::open(payload_path)?;
        let payload_size = payload.metadata()?.len();
        let index = Self::load_index(&index_path, &streams, payload_size)?;

        info!(
            streams = streams.len(),
            records = index.len(),
            "recording opened"
        );

        let selected = (0..index.len()).collect();
        Ok(Self {
            root,
            streams,
            index,
            selected,
            cursor: 0,
            payload,
        })
    }

    fn load_index(
        path: &Path,
        streams: &[StreamDescriptor],
        payload_size: u64,
    ) -> Result<Vec<IndexEntry>> {
        let declared: HashSet<&str> = streams.iter().map(|s| s.name.as_str()).collect();
        let mut index = Vec::new();

        for (i, line) in BufReader::new(File::open(path)?).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: IndexEntry = serde_json::from_str(&line).map_err(|e| IngestionError::Index {
                line: i + 1,
                message: e.to_string(),
            })?;

            if !declared.contains(entry.stream.as_str()) {
                return Err(IngestionError::UndeclaredStream {
                    line: i + 1,
                    stream: entry.stream,
                });
            }
            if entry.offset.saturating_add(entry.len) > payload_size {
                return Err(IngestionError::PayloadOutOfBounds {
                    stream: entry.stream,
                    offset: entry.offset,
                    len: entry.len,
                    size: payload_size,
                });
            }
            index.push(entry);
        }

        if index.windows(2).any(|w| w[0].timestamp_ns > w[1].timestamp_ns) {
            debug!("index not in time order, sorting");
            index.sort_by_key(|e| e.timestamp_ns);
        }
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Total number of records, ignoring the stream filter
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// First and last record timestamps
    pub fn time_span(&self) -> Option<(i64, i64)> {
        Some((self.index.first()?.timestamp_ns, self.index.last()?.timestamp_ns))
    }

    /// Record count per stream, in manifest order
    pub fn message_counts(&self) -> Vec<(StreamDescriptor, usize)> {
        self.streams
            .iter()
            .map(|desc| {
                let count = self
                    .index
                    .iter()
                    .filter(|e| e.stream == desc.name.as_str())
                    .count();
                (desc.clone(), count)
            })
            .collect()
    }

    fn read_payload(&mut self, entry: &IndexEntry) -> Result<Vec<u8>> {
        let len = usize::try_from(entry.len).map_err(|_| IngestionError::PayloadOutOfBounds {
            stream: entry.stream.clone(),
            offset: entry.offset,
            len: entry.len,
            size: u64::MAX,
        })?;
        let mut buf = vec![0u8; len];
        self.payload.seek(SeekFrom::Start(entry.offset))?;
        self.payload.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl RecordSource for RecordingReader {
    fn streams(&self) -> Vec<StreamDescriptor> {
        self.streams.clone()
    }

    fn restrict_to(&mut self, streams: &[StreamId]) -> std::result::Result<(), ContractError> {
        for stream in streams {
            if !self.streams.iter().any(|s| &s.name == stream) {
                return Err(ContractError::unknown_stream(
                    stream.as_str(),
                    self.streams.iter().map(|s| s.name.to_string()),
                ));
            }
        }

        let position = self
            .selected
            .get(self.cursor)
            .copied()
            .unwrap_or(self.index.len());
        self.selected = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, e)| streams.iter().any(|s| s.as_str() == e.stream))
            .map(|(i, _)| i)
            .collect();
        self.cursor = self.selected.partition_point(|&i| i < position);

        debug!(
            streams = streams.len(),
            records = self.selected.len(),
            "stream filter applied"
        );
        Ok(())
    }

    fn has_next(&self) -> bool {
        self.cursor < self.selected.len()
    }

    fn read_next(&mut self) -> std::result::Result<Option<RawRecord>, ContractError> {
        let Some(&pos) = self.selected.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;

        let entry = self.index[pos].clone();
        let data = self.read_payload(&entry)?;
        metrics::counter!("ingestion_records_read_total").increment(1);
        metrics::counter!("ingestion_bytes_read_total").increment(entry.len);

        Ok(Some(RawRecord::new(
            entry.stream.as_str(),
            data,
            entry.timestamp_ns,
        )))
    }

    fn seek(&mut self, timestamp_ns: i64) -> std::result::Result<(), ContractError> {
        let index = &self.index;
        self.cursor = self
            .selected
            .partition_point(|&i| index[i].timestamp_ns < timestamp_ns);
        debug!(timestamp_ns, cursor = self.cursor, "seek");
        Ok(())
    }
}
