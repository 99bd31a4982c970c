//! Timestamped batch files of opportunities.
//!
//! Each scan is written as `opportunities_<YYYYMMDDTHHMMSSZ>.json` in the
//! output directory:
//!
//! ```json
//! { "schema_version": 1, "generated_at": "2026-10-18T12:00:00Z", "opportunities": [ ... ] }
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument};

use super::record::{OpportunityBatch, SCHEMA_VERSION};
use crate::arbitrage::OpportunityCollection;
use crate::error::StorageError;
use crate::metrics;

const FILE_PREFIX: &str = "opportunities_";
const FILE_EXT: &str = "json";

/// A batch read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedBatch {
    /// File the batch came from.
    pub path: PathBuf,
    /// When the batch was produced.
    pub generated_at: OffsetDateTime,
    /// Opportunities with recomputed stake plans.
    pub opportunities: OpportunityCollection,
}

/// Reads and writes opportunity batches in one directory.
#[derive(Debug, Clone)]
pub struct BatchStore {
    dir: PathBuf,
}

impl BatchStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a collection stamped with the current UTC time.
    pub fn save(&self, collection: &OpportunityCollection) -> Result<PathBuf, StorageError> {
        self.save_at(collection, OffsetDateTime::now_utc())
    }

    /// Save a collection stamped with `generated_at`.
    ///
    /// The file is written beside its final name and renamed into place, so a
    /// reader never sees a partial batch.
    #[instrument(skip(self, collection), fields(dir = %self.dir.display(), count = collection.len()))]
    pub fn save_at(
        &self,
        collection: &OpportunityCollection,
        generated_at: OffsetDateTime,
    ) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;

        let generated_at = generated_at.replace_nanosecond(0).unwrap_or(generated_at);
        let path = self.free_path(&batch_stem(generated_at)?);
        let tmp = path.with_extension("json.tmp");

        let batch = OpportunityBatch {
            schema_version: SCHEMA_VERSION,
            generated_at,
            opportunities: collection.to_records(),
        };

        let written = write_batch(&tmp, &batch)
            .and_then(|()| fs::rename(&tmp, &path).map_err(StorageError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        info!(path = %path.display(), count = collection.len(), "Saved opportunity batch");
        Ok(path)
    }

    /// Save a collection, logging and counting a failure instead of returning it.
    pub fn try_save_at(
        &self,
        collection: &OpportunityCollection,
        generated_at: OffsetDateTime,
    ) -> Option<PathBuf> {
        match self.save_at(collection, generated_at) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Failed to save opportunity batch");
                metrics::inc_batch_save_failures();
                None
            }
        }
    }

    /// Load a batch file, recomputing every stake plan.
    #[instrument]
    pub fn load(path: &Path) -> Result<LoadedBatch, StorageError> {
        let raw: Value = serde_json::from_str(&fs::read_to_string(path)?)?;

        let found = raw
            .get("schema_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if found != u64::from(SCHEMA_VERSION) {
            return Err(StorageError::UnsupportedVersion {
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: SCHEMA_VERSION,
            });
        }

        let batch: OpportunityBatch = serde_json::from_value(raw)?;
        let opportunities = OpportunityCollection::from_records(batch.opportunities)?;

        debug!(path = %path.display(), count = opportunities.len(), "Loaded opportunity batch");
        Ok(LoadedBatch {
            path: path.to_path_buf(),
            generated_at: batch.generated_at,
            opportunities,
        })
    }

    /// Batch files in the directory, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>, StorageError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_batch_file(path))
            .collect();
        paths.sort_by_cached_key(|path| batch_order(path));
        Ok(paths)
    }

    /// Path of the newest batch.
    pub fn latest(&self) -> Result<PathBuf, StorageError> {
        self.list()?.pop().ok_or_else(|| StorageError::NoBatch {
            dir: self.dir.display().to_string(),
        })
    }

    /// Load the newest batch.
    pub fn load_latest(&self) -> Result<LoadedBatch, StorageError> {
        Self::load(&self.latest()?)
    }

    fn free_path(&self, stem: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{stem}.{FILE_EXT}"));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{stem}_{n}.{FILE_EXT}"));
            n += 1;
        }
        path
    }
}

fn batch_stem(generated_at: OffsetDateTime) -> Result<String, StorageError> {
    let format = format_description!("[year][month][day]T[hour][minute][second]Z");
    let utc = generated_at.to_offset(time::UtcOffset::UTC);
    Ok(format!("{FILE_PREFIX}{}", utc.format(&format)?))
}

fn write_batch(path: &Path, batch: &OpportunityBatch) -> Result<(), StorageError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, batch)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Timestamp, then same-second suffix (`_2` before `_10`).
fn batch_order(path: &Path) -> (String, u32) {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let stamp = stem.strip_prefix(FILE_PREFIX).unwrap_or(stem);
    match stamp.split_once('_') {
        Some((at, n)) => (at.to_string(), n.parse().unwrap_or(0)),
        None => (stamp.to_string(), 0),
    }
}

fn is_batch_file(path: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(FILE_PREFIX));
    named && path.extension().and_then(|e| e.to_str()) == Some(FILE_EXT)
}
