// src/output/types.rs
//! Type definitions for the export stage.
//!
//! Export is split into planning (pure, builds an [`ExportPlan`]) and
//! delivery (performs the writes). Reports flow back from both.

use crate::model::Bucket;
use crate::types::RecordId;
use serde_json::Value;
use std::path::PathBuf;

/// Every file one export run will write, all under `dir`.
#[derive(Debug, Clone, Default)]
pub struct ExportPlan {
    pub dir: PathBuf,
    pub files: Vec<ExportFile>,
}

impl ExportPlan {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, contents: FileContents) -> Self {
        self.files.push(ExportFile {
            name: name.into(),
            contents,
        });
        self
    }
}

/// One file of the plan. `name` is relative to the plan directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub name: String,
    pub contents: FileContents,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileContents {
    /// Serialized as a pretty-printed JSON array.
    Records(Vec<Value>),
    Text(String),
}

/// What delivering a plan did on disk.
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    pub written: Vec<WrittenFile>,
    pub failed: Vec<FailedWrite>,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn bytes_written(&self) -> u64 {
        self.written.iter().map(|file| file.bytes).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub path: PathBuf,
    pub error: String,
}

/// A record the mapper could not handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Export file the record belongs to, such as `index` or `media`.
    pub group: String,
    pub bucket: Bucket,
    pub id: Option<RecordId>,
    pub reason: String,
}

/// What an export run produced.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Records written per export file, placeholders included.
    pub records_written: Vec<(String, usize)>,
    pub failures: Vec<RecordFailure>,
    pub files: Vec<PathBuf>,
    pub bytes_written: u64,
}

impl ExportReport {
    pub fn total_records(&self) -> usize {
        self.records_written.iter().map(|(_, n)| n).sum()
    }
}
