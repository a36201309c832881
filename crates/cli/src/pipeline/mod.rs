//! Export pipeline wiring.

mod orchestrator;

pub use orchestrator::ExportPipeline;
