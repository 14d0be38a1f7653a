//! Conversion of normalized boxes into pixel rectangles.

use log::{trace, warn};
use serde::Serialize;

use crate::dimensions::ImageDimensions;
use crate::error::{DebugRecordError, Result};
use crate::record::{DetectionRecord, ScaledBox, ScaledRecord};

/// What to do when a single record cannot be scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Stop at the first bad record
    #[default]
    Abort,
    /// Leave the record out of the output and keep going
    Skip,
}

/// A record left out under `MismatchPolicy::Skip`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub line: usize,
    pub reason: String,
}

/// Output of one scaling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaledRecords {
    pub records: Vec<ScaledRecord>,
    pub skipped: Vec<SkippedRecord>,
}

/// `normalized * dimension`, truncated toward zero.
pub fn scale_coordinate(normalized: f64, dimension: u32) -> i64 {
    (normalized * f64::from(dimension)) as i64
}

/// Scale one normalized `[x1, y1, x2, y2]` box. X is scaled by width, y by height.
pub fn scale_bbox(bbox: [f64; 4], dims: ImageDimensions) -> [i64; 4] {
    [
        scale_coordinate(bbox[0], dims.width),
        scale_coordinate(bbox[1], dims.height),
        scale_coordinate(bbox[2], dims.width),
        scale_coordinate(bbox[3], dims.height),
    ]
}

/// Derive the pixel boxes of a single record.
///
/// `labels` and `confs` may be longer than `bboxes`; extra entries are ignored.
pub fn scale_record(record: &DetectionRecord, dims: ImageDimensions) -> Result<Vec<ScaledBox>> {
    let bboxes = record.bboxes()?;
    if bboxes.is_empty() {
        return Ok(Vec::new());
    }

    let labels = record.labels()?;
    let confs = record.confs()?;

    if labels.len() < bboxes.len() || confs.len() < bboxes.len() {
        return Err(DebugRecordError::IndexMismatch {
            record: record.index,
            line: record.line,
            bboxes: bboxes.len(),
            labels: labels.len(),
            confs: confs.len(),
        });
    }

    let objects = bboxes
        .into_iter()
        .zip(labels)
        .zip(confs)
        .map(|((bbox, class_name), conf)| {
            let [x1, y1, x2, y2] = scale_bbox(bbox, dims);
            ScaledBox {
                x1,
                y1,
                x2,
                y2,
                conf,
                class_name,
            }
        })
        .collect();

    Ok(objects)
}

/// Scale every record against one shared set of dimensions.
///
/// Each call builds its output from scratch; nothing from a previous pass is
/// carried over.
pub fn scale_records(
    records: &[DetectionRecord],
    dims: ImageDimensions,
    policy: MismatchPolicy,
) -> Result<ScaledRecords> {
    let mut output = ScaledRecords::default();

    for record in records {
        match scale_record(record, dims) {
            Ok(objects) => {
                trace!(
                    "Record {} (line {}): {} object(s)",
                    record.index,
                    record.line,
                    objects.len()
                );
                output.records.push(ScaledRecord {
                    record: record.clone(),
                    objects,
                });
            }
            Err(e) if policy == MismatchPolicy::Skip && e.is_per_record() => {
                warn!("Skipping record {} (line {}): {e}", record.index, record.line);
                output.skipped.push(SkippedRecord {
                    index: record.index,
                    line: record.line,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(output)
}
