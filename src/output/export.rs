// src/output/export.rs
//! Mapping a harvest onto export files.
//!
//! There is one `<type>.json` file per item type, in catalogue order:
//! `documents`, `audio_visual_documents`, `images`, `index` (every index
//! sub-type), `issues`, `newspaper_articles`, `item_sets`, `media` and
//! `references` (every reference class).
//!
//! Mapping is CPU work, so it runs on a rayon pool inside `spawn_blocking`
//! and never stalls the async runtime. A record the mapper rejects becomes
//! a placeholder `{"o:id": .., "error": ..}` in the output and a line in
//! `errors.log`; it never fails the export.

use super::mapper::{PassThroughMapper, RecordMapper};
use super::types::{ExportPlan, ExportReport, FileContents, RecordFailure};
use super::writer::deliver;
use crate::api::categories::export_group;
use crate::error::AppError;
use crate::model::{Bucket, Harvest, Record};
use crate::types::RecordId;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ERROR_LOG_FILE: &str = "errors.log";
pub const PARTIAL_DIR: &str = "partial";

/// Records headed for one export file.
struct ExportGroup<'a> {
    name: &'a str,
    bucket: Bucket,
    records: Vec<&'a Record>,
}

struct MappedGroup {
    name: String,
    values: Vec<Value>,
    failures: Vec<RecordFailure>,
}

/// Maps every record and writes `<type>.json` per non-empty item type, plus
/// `errors.log` when any record failed.
pub async fn export(
    harvest: Arc<Harvest>,
    mapper: Arc<dyn RecordMapper>,
    output_dir: &Path,
) -> Result<ExportReport, AppError> {
    let mapped = tokio::task::spawn_blocking(move || map_harvest(&harvest, mapper.as_ref()))
        .await??;

    let (plan, mut report) = plan_export(mapped, output_dir);
    let delivered = deliver(plan);
    if !delivered.is_success() {
        let failures: Vec<String> = delivered
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.path.display(), f.error))
            .collect();
        return Err(AppError::Export(failures.join(", ")));
    }
    report.bytes_written = delivered.bytes_written();
    report.files = delivered.written.into_iter().map(|file| file.path).collect();

    log::info!(
        "Exported {} records into {} file(s) under {}",
        report.total_records(),
        report.files.len(),
        output_dir.display()
    );
    if !report.failures.is_empty() {
        log::warn!(
            "{} record(s) could not be mapped; see {}",
            report.failures.len(),
            output_dir.join(ERROR_LOG_FILE).display()
        );
    }
    Ok(report)
}

/// Best-effort raw dump of whatever was harvested, under `<dir>/partial/`.
pub async fn write_partial(harvest: Arc<Harvest>, output_dir: &Path) -> Option<PathBuf> {
    if harvest.is_empty() {
        return None;
    }
    let dir = output_dir.join(PARTIAL_DIR);
    match export(harvest, Arc::new(PassThroughMapper), &dir).await {
        Ok(_) => Some(dir),
        Err(e) => {
            log::error!("Could not write partial results: {}", e);
            None
        }
    }
}

fn map_harvest(harvest: &Harvest, mapper: &dyn RecordMapper) -> Result<Vec<MappedGroup>, AppError> {
    let workers = num_cpus::get().clamp(1, 8);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| AppError::Export(format!("Cannot start export workers: {}", e)))?;

    Ok(pool.install(|| {
        group_records(harvest)
            .into_iter()
            .map(|group| map_group(group, mapper))
            .collect()
    }))
}

/// Gathers each category's records under its export file, in catalogue
/// order. A record two categories of one file share is written once.
fn group_records(harvest: &Harvest) -> Vec<ExportGroup<'_>> {
    let mut groups: IndexMap<&str, (ExportGroup<'_>, HashSet<RecordId>)> = IndexMap::new();
    for (category, bucket, _) in harvest.category_counts() {
        let name = export_group(category);
        let (group, seen) = groups.entry(name).or_insert_with(|| {
            let group = ExportGroup {
                name,
                bucket,
                records: Vec::new(),
            };
            (group, HashSet::new())
        });
        for record in harvest.category(category) {
            if record.id().map_or(true, |id| seen.insert(id)) {
                group.records.push(record);
            }
        }
    }
    groups.into_values().map(|(group, _)| group).collect()
}

fn map_group(group: ExportGroup<'_>, mapper: &dyn RecordMapper) -> MappedGroup {
    let results: Vec<Result<Value, RecordFailure>> = group
        .records
        .par_iter()
        .map(|record| {
            mapper.map(group.bucket, record).map_err(|e| RecordFailure {
                group: group.name.to_string(),
                bucket: group.bucket,
                id: record.id(),
                reason: e.to_string(),
            })
        })
        .collect();

    let mut values = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(failure) => {
                values.push(json!({
                    "o:id": failure.id.map(|id| id.get()),
                    "error": failure.reason,
                }));
                failures.push(failure);
            }
        }
    }

    MappedGroup {
        name: group.name.to_string(),
        values,
        failures,
    }
}

fn plan_export(mapped: Vec<MappedGroup>, output_dir: &Path) -> (ExportPlan, ExportReport) {
    let mut plan = ExportPlan::new(output_dir);
    let mut report = ExportReport::default();

    for group in mapped {
        report.failures.extend(group.failures);
        if group.values.is_empty() {
            continue;
        }
        report.records_written.push((group.name.clone(), group.values.len()));
        plan = plan.with_file(
            format!("{}.json", group.name),
            FileContents::Records(group.values),
        );
    }

    if !report.failures.is_empty() {
        let log: String = report
            .failures
            .iter()
            .map(|f| {
                let id = f.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
                format!("{}\t{}\t{}\n", f.group, id, f.reason)
            })
            .collect();
        plan = plan.with_file(ERROR_LOG_FILE, FileContents::Text(log));
    }

    (plan, report)
}
