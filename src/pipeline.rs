// src/pipeline.rs
//! Pipeline capability traits: the two stages of a harvest run.
//!
//! Each trait describes a single capability, enabling testing each stage in isolation.

use crate::error::AppError;
use crate::model::Harvest;
use crate::output::ExportReport;
use std::sync::Arc;

/// Gathers records from the remote collection.
#[async_trait::async_trait]
pub trait RecordSource {
    async fn collect(&self) -> Result<Harvest, AppError>;
}

/// Writes a harvest to its destination.
#[async_trait::async_trait]
pub trait RecordExporter {
    async fn export(&self, harvest: Arc<Harvest>) -> Result<ExportReport, AppError>;
}
