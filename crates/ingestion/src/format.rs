//! Recording directory layout
//!
//! ```text
//! <recording>/
//!   manifest.json   stream table
//!   records.jsonl   one index line per record, global time order
//!   payload.bin     concatenated record bytes
//! ```

use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const INDEX_FILE: &str = "records.jsonl";
pub const PAYLOAD_FILE: &str = "payload.bin";

/// Current layout version
pub const FORMAT_VERSION: u32 = 1;

/// Stream table stored in `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub streams: Vec<ManifestStream>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestStream {
    pub name: String,
    /// Message type descriptor, e.g. `sensor_msgs/msg/Image`
    pub type_name: String,
}

/// One line of `records.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub stream: String,
    pub timestamp_ns: i64,
    /// Byte offset into `payload.bin`
    pub offset: u64,
    pub len: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_line_shape() {
        let entry = IndexEntry {
            stream: "/rgb".into(),
            timestamp_ns: 42,
            offset: 0,
            len: 3,
        };
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"stream":"/rgb","timestamp_ns":42,"offset":0,"len":3}"#
        );
    }
}
