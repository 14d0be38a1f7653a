//! Reference image resolution.
//!
//! A debug log is bound to exactly one image size: the dimensions of the image
//! named by its first record. Logs mixing frame sizes are not supported.

use image::ImageReader;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DebugRecordError, Result};
use crate::record::DetectionRecord;

/// Pixel size of the reference image for a whole log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Strip any directory part from a recorded image path.
///
/// Capture hosts write both POSIX and Windows style paths, so both separators
/// are treated as directory boundaries.
pub fn image_file_name(recorded: &str) -> Option<&str> {
    recorded
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
}

/// Path of the reference image: the first record's file name, relative to `log_dir`.
///
/// Returns `Ok(None)` when there are no records.
pub fn reference_image_path(
    records: &[DetectionRecord],
    log_path: &Path,
    log_dir: &Path,
) -> Result<Option<PathBuf>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };

    let name = first
        .image_file()
        .and_then(image_file_name)
        .ok_or_else(|| DebugRecordError::MissingImageReference {
            path: log_path.to_path_buf(),
        })?;

    Ok(Some(log_dir.join(name)))
}

/// Read width and height from an image file header.
pub fn read_image_dimensions(path: &Path) -> Result<ImageDimensions> {
    let not_found = |source| DebugRecordError::ImageNotFound {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .map_err(not_found)?
        .with_guessed_format()
        .map_err(not_found)?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| DebugRecordError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if width == 0 || height == 0 {
        return Err(DebugRecordError::Decode {
            path: path.to_path_buf(),
            reason: format!("image has zero size ({width}x{height})"),
        });
    }

    debug!("Reference image {} is {width}x{height}", path.display());
    Ok(ImageDimensions { width, height })
}

/// Resolve the dimensions shared by every record of a log.
///
/// An empty record set never touches the filesystem.
pub fn resolve_dimensions(
    records: &[DetectionRecord],
    log_path: &Path,
    log_dir: &Path,
) -> Result<Option<ImageDimensions>> {
    match reference_image_path(records, log_path, log_dir)? {
        Some(image_path) => read_image_dimensions(&image_path).map(Some),
        None => Ok(None),
    }
}
