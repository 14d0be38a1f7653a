//! Newline-delimited JSON loader for debug inference logs.

use log::{debug, trace};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DebugRecordError, Result};
use crate::record::DetectionRecord;

/// Read every record of a debug log, in file order.
///
/// Each non-blank line must be a standalone JSON object. The first malformed
/// line aborts the load. No field validation happens here.
pub fn load_records(path: &Path) -> Result<Vec<DetectionRecord>> {
    let file = File::open(path).map_err(|source| DebugRecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(BufReader::new(file), path)
}

/// Parse records from any buffered reader. `path` is only used for error context.
pub fn parse_records<R: BufRead>(mut reader: R, path: &Path) -> Result<Vec<DetectionRecord>> {
    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| DebugRecordError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let line = std::str::from_utf8(&buf)
            .map_err(|e| parse_error(path, line_number, format!("invalid UTF-8: {e}")))?;

        if line.trim().is_empty() {
            trace!("Skipping blank line {line_number} of {}", path.display());
            continue;
        }

        let value: Value =
            serde_json::from_str(line).map_err(|source| DebugRecordError::Parse {
                path: path.to_path_buf(),
                line: line_number,
                source,
            })?;

        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(parse_error(
                    path,
                    line_number,
                    format!("expected a JSON object, found {}", json_kind(&other)),
                ));
            }
        };

        records.push(DetectionRecord::new(records.len(), line_number, fields));
    }

    debug!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn parse_error(path: &Path, line: usize, message: String) -> DebugRecordError {
    DebugRecordError::Parse {
        path: path.to_path_buf(),
        line,
        source: <serde_json::Error as serde::de::Error>::custom(message),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
