//! # Ingestion
//!
//! Log access and record decoding.
//!
//! Responsibilities:
//! - Read recording directories in global time order (`RecordingReader`)
//! - Resolve stream message types (`TypeRegistry`), excluding unknown ones
//! - Deserialize raw record bytes into typed payloads (`MessageDecoder`)
//! - Write recordings for fixtures and tests (`RecordingWriter`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::RecordSource;
//! use ingestion::{MessageDecoder, RecordingReader, TypeRegistry};
//!
//! let mut reader = RecordingReader::open("run_01")?;
//! let table = TypeRegistry::default().resolve_streams(&reader.streams());
//! let ids = table.require(&["/camera/color", "/camera/depth"])?;
//! reader.restrict_to(&ids)?;
//!
//! let decoder = MessageDecoder::new(table);
//! while let Some(raw) = reader.read_next()? {
//!     let record = decoder.decode(raw)?;
//! }
//! ```

mod decoder;
mod error;
mod format;
mod mock;
mod reader;
mod registry;
mod writer;

// Re-exports
pub use decoder::{encode_message, encode_payload, MessageDecoder, PassthroughDecoder};
pub use error::{IngestionError, Result};
pub use format::{IndexEntry, Manifest, ManifestStream, FORMAT_VERSION};
pub use mock::MemorySource;
pub use reader::RecordingReader;
pub use registry::{StreamTable, TypeRegistry};
pub use writer::RecordingWriter;
