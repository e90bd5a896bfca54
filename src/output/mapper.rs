// src/output/mapper.rs
//! The seam between harvested records and downstream output formats.

use crate::model::{Bucket, Record};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MappingError(pub String);

/// Turns one raw record into one output value.
///
/// Called from a worker pool, so implementations must be thread safe and
/// must not assume any call order.
pub trait RecordMapper: Send + Sync {
    fn map(&self, bucket: Bucket, record: &Record) -> Result<Value, MappingError>;
}

/// Writes records exactly as the API returned them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughMapper;

impl RecordMapper for PassThroughMapper {
    fn map(&self, _bucket: Bucket, record: &Record) -> Result<Value, MappingError> {
        Ok(record.clone().into_value())
    }
}
