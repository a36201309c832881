//! Record decoders
//!
//! 记录负载使用 bincode 编码，类型由 [`StreamTable`] 决定。

use contracts::{ContractError, MessageKind, Payload, RawRecord, Record, RecordDecoder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::error::{IngestionError, Result};
use crate::registry::StreamTable;

/// Typed decoder for resolved streams
#[derive(Debug, Clone)]
pub struct MessageDecoder {
    table: StreamTable,
}

impl MessageDecoder {
    pub fn new(table: StreamTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &StreamTable {
        &self.table
    }
}

fn deserialize<T: DeserializeOwned>(raw: &RawRecord) -> std::result::Result<T, ContractError> {
    bincode::deserialize(&raw.data).map_err(|e| ContractError::decode(raw.stream.as_str(), e.to_string()))
}

impl RecordDecoder for MessageDecoder {
    fn decode(&self, raw: RawRecord) -> std::result::Result<Record, ContractError> {
        let kind = self.table.kind_of(&raw.stream).ok_or_else(|| {
            ContractError::decode(raw.stream.as_str(), "stream has no resolved message type")
        })?;

        let payload = match kind {
            MessageKind::Image => Payload::Image(deserialize(&raw)?),
            MessageKind::CompressedImage => Payload::CompressedImage(deserialize(&raw)?),
            MessageKind::CameraInfo => Payload::CameraInfo(deserialize(&raw)?),
            MessageKind::PoseStamped => Payload::Pose(deserialize(&raw)?),
        };

        trace!(stream = %raw.stream, kind = payload.kind_name(), bytes = raw.data.len(), "decoded");
        Ok(Record::new(raw.stream, raw.timestamp_ns, payload))
    }
}

/// Decoder wrapping the bytes unchanged in [`Payload::Raw`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughDecoder;

impl RecordDecoder for PassthroughDecoder {
    fn decode(&self, raw: RawRecord) -> std::result::Result<Record, ContractError> {
        Ok(Record::new(raw.stream, raw.timestamp_ns, Payload::Raw(raw.data)))
    }
}

/// Serialize one message the way [`MessageDecoder`] expects it
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    bincode::serialize(msg).map_err(|e| IngestionError::Encode(e.to_string()))
}

/// Serialize a payload, returning its message kind; `Raw` bytes are passed through untyped
pub fn encode_payload(payload: &Payload) -> Result<(Option<MessageKind>, Vec<u8>)> {
    Ok(match payload {
        Payload::Image(msg) => (Some(MessageKind::Image), encode_message(msg)?),
        Payload::CompressedImage(msg) => (Some(MessageKind::CompressedImage), encode_message(msg)?),
        Payload::CameraInfo(msg) => (Some(MessageKind::CameraInfo), encode_message(msg)?),
        Payload::Pose(msg) => (Some(MessageKind::PoseStamped), encode_message(msg)?),
        Payload::Raw(bytes) => (None, bytes.to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use contracts::{Header, PoseStampedMsg, StreamDescriptor, Time};

    fn decoder() -> MessageDecoder {
        let table = TypeRegistry::default().resolve_streams(&[StreamDescriptor {
            name: "/pose".into(),
            type_name: MessageKind::PoseStamped.type_name().into(),
        }]);
        MessageDecoder::new(table)
    }

    #[test]
    fn test_decode_pose() {
        let mut msg = PoseStampedMsg {
            header: Header {
                stamp: Time { sec: 3, nanosec: 5 },
                frame_id: "map".into(),
            },
            ..Default::default()
        };
        msg.pose.position.x = 1.5;

        let (kind, bytes) = encode_payload(&Payload::Pose(msg.clone())).unwrap();
        assert_eq!(kind, Some(MessageKind::PoseStamped));

        let record = decoder().decode(RawRecord::new("/pose", bytes, 7)).unwrap();
        assert_eq!(record.timestamp_ns, 7);
        match record.payload {
            Payload::Pose(decoded) => assert_eq!(decoded, msg),
            other => panic!("unexpected payload {}", other.kind_name()),
        }
    }

    #[test]
    fn test_truncated_bytes_fail() {
        let err = decoder()
            .decode(RawRecord::new("/pose", vec![1u8, 2], 0))
            .unwrap_err();
        assert!(matches!(err, ContractError::Decode { .. }));
    }

    #[test]
    fn test_unresolved_stream_fails() {
        let err = decoder().decode(RawRecord::new("/rgb", Vec::<u8>::new(), 0)).unwrap_err();
        assert!(err.to_string().contains("/rgb"));
    }
}
