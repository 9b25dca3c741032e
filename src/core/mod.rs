//! Core module - identifiers, routing, assembly, and storage

pub mod assembler;
pub mod classid;
pub mod config;
pub mod project;
pub mod router;
pub mod sequence;
pub mod store;

pub use assembler::{
    import_batch, update_record, BatchReport, RecordAssembler, RecordInput, RowError, RowOutcome,
};
pub use classid::{ClassCode, ClassSegments, SegmentError, DEFAULT_PREFIX, MAX_SEQUENCE};
pub use config::Config;
pub use project::{Project, ProjectError};
pub use router::{route, RoutedAttributes};
pub use sequence::{SequenceAllocator, SequenceError};
pub use store::{PartFilter, PartStore, StoreError};
