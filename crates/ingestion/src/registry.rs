//! Message type registry
//!
//! 把日志中的类型描述符解析为 [`MessageKind`]，无法解析的流不进入可用集合。

use std::collections::HashMap;

use contracts::{ContractError, MessageKind, StreamDescriptor, StreamId};
use tracing::debug;

/// Type descriptor -> message kind
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    kinds: HashMap<String, MessageKind>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in [
            MessageKind::Image,
            MessageKind::CompressedImage,
            MessageKind::CameraInfo,
            MessageKind::PoseStamped,
        ] {
            registry.register(kind.type_name(), kind);
        }
        registry
    }
}

impl TypeRegistry {
    /// Registry with no known types
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Register (or override) a type descriptor
    pub fn register(&mut self, type_name: impl Into<String>, kind: MessageKind) {
        self.kinds.insert(type_name.into(), kind);
    }

    pub fn resolve(&self, type_name: &str) -> Option<MessageKind> {
        self.kinds.get(type_name).copied()
    }

    /// Resolve every stream of a log, dropping the ones with unknown types
    pub fn resolve_streams(&self, descriptors: &[StreamDescriptor]) -> StreamTable {
        let mut table = StreamTable::default();
        for desc in descriptors {
            match self.resolve(&desc.type_name) {
                Some(kind) => table.insert(desc.name.clone(), kind),
                None => debug!(
                    stream = %desc.name,
                    type_name = %desc.type_name,
                    "unsupported message type, stream excluded"
                ),
            }
        }
        table
    }
}

/// Streams of one log whose message type could be resolved
#[derive(Debug, Clone, Default)]
pub struct StreamTable {
    order: Vec<StreamId>,
    kinds: HashMap<StreamId, MessageKind>,
}

impl StreamTable {
    fn insert(&mut self, stream: StreamId, kind: MessageKind) {
        if self.kinds.insert(stream.clone(), kind).is_none() {
            self.order.push(stream);
        }
    }

    pub fn kind_of(&self, stream: &str) -> Option<MessageKind> {
        self.kinds.get(stream).copied()
    }

    /// Available stream names in log order
    pub fn available(&self) -> impl Iterator<Item = &StreamId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up the requested streams
    ///
    /// # Errors
    /// First requested name that is not available, listing what is
    pub fn require<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<StreamId>, ContractError> {
        requested
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.order
                    .iter()
                    .find(|id| id.as_str() == name)
                    .cloned()
                    .ok_or_else(|| {
                        ContractError::unknown_stream(name, self.order.iter().map(|id| id.to_string()))
                    })
            })
            .collect()
    }

    /// Look up a stream and check its message kind
    pub fn require_kind(&self, stream: &str, expected: &[MessageKind]) -> Result<MessageKind, ContractError> {
        let kind = self.kind_of(stream).ok_or_else(|| {
            ContractError::unknown_stream(stream, self.order.iter().map(|id| id.to_string()))
        })?;
        if expected.contains(&kind) {
            Ok(kind)
        } else {
            Err(ContractError::config_validation(
                stream,
                format!(
                    "stream has type {}, expected one of [{}]",
                    kind.type_name(),
                    expected
                        .iter()
                        .map(|k| k.type_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ))
        }
    }
}
