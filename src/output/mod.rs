// src/output/mod.rs
//! Output handling with clear separation of planning and execution.
//!
//! Harvested records go through a [`RecordMapper`] into an [`ExportPlan`]
//! (pure), which the writer then delivers (I/O).

mod export;
mod mapper;
mod types;
mod writer;

// Re-export the public interface
pub use export::{export, write_partial, ERROR_LOG_FILE, PARTIAL_DIR};
pub use mapper::{MappingError, PassThroughMapper, RecordMapper};
pub use types::{
    ExportFile, ExportPlan, ExportReport, FailedWrite, FileContents, RecordFailure, WriteOutcome,
    WrittenFile,
};
pub use writer::deliver;
