//! Abstraction layers for the pipeline's external collaborators
//!
//! The pipeline never reaches for ambient state: the record source, the
//! persistence sink, the event logger and the label resolver are all handed
//! to the coordinator as trait objects. Each module ships reference
//! implementations used by the binary and by tests.

pub mod logger;
pub mod sink;
pub mod source;
pub mod text;

pub use logger::{PipelineLogger, TracingLogger};
pub use sink::{EntityHandle, JsonLinesSink, MemorySink, PendingEntity, Sink};
pub use source::{JsonFileSource, Source, SourceFormat, StaticSource};
pub use text::{resolve_or_fallback, CatalogResolver, TextResolver};
