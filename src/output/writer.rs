// src/output/writer.rs
//! Delivers an [`ExportPlan`] to disk.
//!
//! Each file is streamed into a hidden `.<name>.part` sibling and renamed
//! over the target once complete, so an interrupted run leaves the previous
//! export in place instead of a truncated one.

use super::types::{ExportPlan, FailedWrite, FileContents, WriteOutcome, WrittenFile};
use crate::error::AppError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Writes every file of the plan.
///
/// A failed file is reported, not raised; later files still get written.
pub fn deliver(plan: ExportPlan) -> WriteOutcome {
    let started = Instant::now();
    let mut outcome = WriteOutcome::default();

    if let Err(e) = fs::create_dir_all(&plan.dir) {
        log::error!("Cannot create {}: {}", plan.dir.display(), e);
        outcome.failed.push(FailedWrite {
            path: plan.dir,
            error: e.to_string(),
        });
        return outcome;
    }

    for file in plan.files {
        let path = plan.dir.join(&file.name);
        match replace_file(&plan.dir, &file.name, &file.contents) {
            Ok(bytes) => {
                log::info!("Wrote {} ({} bytes)", path.display(), bytes);
                outcome.written.push(WrittenFile { path, bytes });
            }
            Err(e) => {
                log::error!("Cannot write {}: {}", path.display(), e);
                outcome.failed.push(FailedWrite {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    log::debug!(
        "Delivered {} file(s), {} failed, {} bytes in {}ms",
        outcome.written.len(),
        outcome.failed.len(),
        outcome.bytes_written(),
        started.elapsed().as_millis()
    );
    outcome
}

fn replace_file(dir: &Path, name: &str, contents: &FileContents) -> Result<u64, AppError> {
    let part = part_path(dir, name);
    let result = write_contents(&part, contents).and_then(|bytes| {
        fs::rename(&part, dir.join(name))?;
        Ok(bytes)
    });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn part_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!(".{}.part", name))
}

fn write_contents(path: &Path, contents: &FileContents) -> Result<u64, AppError> {
    let mut out = BufWriter::new(File::create(path)?);
    match contents {
        FileContents::Records(values) => serde_json::to_writer_pretty(&mut out, values)?,
        FileContents::Text(text) => out.write_all(text.as_bytes())?,
    }
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}
