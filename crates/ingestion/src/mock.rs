//! In-memory record source
//!
//! 用于不依赖磁盘录制文件的测试。

use bytes::Bytes;
use contracts::{ContractError, RawRecord, RecordSource, StreamDescriptor, StreamId};
use tracing::trace;

/// RecordSource over a vector of records
///
/// Records are sorted by timestamp on construction. Every `seek` target is
/// kept so tests can assert on the driver's behaviour.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    streams: Vec<StreamDescriptor>,
    records: Vec<RawRecord>,
    filter: Option<Vec<StreamId>>,
    cursor: usize,
    seeks: Vec<i64>,
    reads: usize,
}

impl MemorySource {
    pub fn new(streams: Vec<StreamDescriptor>, mut records: Vec<RawRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp_ns);
        Self {
            streams,
            records,
            ..Default::default()
        }
    }

    /// Build from `(stream, timestamp_ns)` pairs with empty payloads and an untyped stream table
    pub fn from_timestamps<'a>(records: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let records: Vec<RawRecord> = records
            .into_iter()
            .map(|(stream, t)| RawRecord::new(stream, Bytes::new(), t))
            .collect();

        let mut streams: Vec<StreamDescriptor> = Vec::new();
        for record in &records {
            if !streams.iter().any(|s| s.name == record.stream) {
                streams.push(StreamDescriptor {
                    name: record.stream.clone(),
                    type_name: "raw".into(),
                });
            }
        }
        Self::new(streams, records)
    }

    /// Seek targets received so far
    pub fn seeks(&self) -> &[i64] {
        &self.seeks
    }

    /// Number of records handed out
    pub fn reads(&self) -> usize {
        self.reads
    }

    fn passes(&self, record: &RawRecord) -> bool {
        match &self.filter {
            Some(filter) => filter.contains(&record.stream),
            None => true,
        }
    }

    fn skip_filtered(&mut self) {
        while self
            .records
            .get(self.cursor)
            .is_some_and(|r| !self.passes(r))
        {
            self.cursor += 1;
        }
    }
}

impl RecordSource for MemorySource {
    fn streams(&self) -> Vec<StreamDescriptor> {
        self.streams.clone()
    }

    fn restrict_to(&mut self, streams: &[StreamId]) -> Result<(), ContractError> {
        if let Some(missing) = streams
            .iter()
            .find(|id| !self.streams.iter().any(|s| &s.name == *id))
        {
            return Err(ContractError::unknown_stream(
                missing.as_str(),
                self.streams.iter().map(|s| s.name.to_string()),
            ));
        }
        self.filter = Some(streams.to_vec());
        Ok(())
    }

    fn has_next(&self) -> bool {
        self.records[self.cursor.min(self.records.len())..]
            .iter()
            .any(|r| self.passes(r))
    }

    fn read_next(&mut self) -> Result<Option<RawRecord>, ContractError> {
        self.skip_filtered();
        let Some(record) = self.records.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;
        self.reads += 1;
        trace!(stream = %record.stream, timestamp_ns = record.timestamp_ns, "memory record");
        Ok(Some(record))
    }

    fn seek(&mut self, timestamp_ns: i64) -> Result<(), ContractError> {
        self.seeks.push(timestamp_ns);
        self.cursor = self
            .records
            .partition_point(|r| r.timestamp_ns < timestamp_ns);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_and_seek() {
        let mut source =
            MemorySource::from_timestamps([("/a", 30), ("/b", 10), ("/a", 20), ("/b", 40)]);

        source.restrict_to(&[StreamId::from("/a")]).unwrap();
        assert_eq!(source.read_next().unwrap().unwrap().timestamp_ns, 20);

        source.seek(25).unwrap();
        assert_eq!(source.read_next().unwrap().unwrap().timestamp_ns, 30);
        assert!(!source.has_next());
        assert!(source.read_next().unwrap().is_none());
        assert_eq!(source.seeks(), &[25]);
    }

    #[test]
    fn test_unknown_stream() {
        let mut source = MemorySource::from_timestamps([("/a", 1)]);
        assert!(source.restrict_to(&[StreamId::from("/x")]).is_err());
    }
}
