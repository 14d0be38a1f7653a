//! Load, scale and tally one debug log.
//!
//! `DebugRecordLog` owns the records of a single log file. Every stage is
//! re-derived from what is held in memory, and `reload` replaces the held
//! records wholesale. One instance serves one caller at a time.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::dimensions::{resolve_dimensions, ImageDimensions};
use crate::error::Result;
use crate::loader::load_records;
use crate::record::{DetectionRecord, ScaledRecord};
use crate::scaler::{scale_records, MismatchPolicy, SkippedRecord};
use crate::tally::{BatchSummary, ClassTally};

/// Records of one debug log, as loaded from disk.
#[derive(Debug, Clone)]
pub struct DebugRecordLog {
    path: PathBuf,
    records: Vec<DetectionRecord>,
}

impl DebugRecordLog {
    /// Load a log. Records are not validated beyond JSON syntax.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = load_records(&path)?;
        Ok(Self { path, records })
    }

    /// Re-read the log from disk, discarding the records held so far.
    pub fn reload(&mut self) -> Result<()> {
        self.records = load_records(&self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the log lives in; reference images are resolved against it.
    pub fn log_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Dimensions of the image named by the first record, or `None` for an empty log.
    pub fn resolve_dimensions(&self) -> Result<Option<ImageDimensions>> {
        resolve_dimensions(&self.records, &self.path, self.log_dir())
    }

    /// Resolve the reference image and scale every record against it.
    pub fn scale(&self, policy: MismatchPolicy) -> Result<ScaledBatch> {
        let Some(dimensions) = self.resolve_dimensions()? else {
            debug!("{} has no records, nothing to scale", self.path.display());
            return Ok(ScaledBatch {
                source: self.path.clone(),
                dimensions: None,
                records: Vec::new(),
                skipped: Vec::new(),
            });
        };

        let scaled = scale_records(&self.records, dimensions, policy)?;
        info!(
            "Scaled {} record(s) from {} against {}x{}",
            scaled.records.len(),
            self.path.display(),
            dimensions.width,
            dimensions.height
        );

        Ok(ScaledBatch {
            source: self.path.clone(),
            dimensions: Some(dimensions),
            records: scaled.records,
            skipped: scaled.skipped,
        })
    }
}

/// Scaled records of one log, all bound to a single reference image size.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledBatch {
    pub source: PathBuf,
    /// `None` only when the log had no records
    pub dimensions: Option<ImageDimensions>,
    pub records: Vec<ScaledRecord>,
    pub skipped: Vec<SkippedRecord>,
}

impl ScaledBatch {
    pub fn tally(&self) -> ClassTally {
        crate::tally::tally_classes(&self.records)
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_records(&self.records)
    }

    /// Serialize the records as newline-delimited JSON.
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}
