//! Detection record types.
//!
//! A `DetectionRecord` keeps the raw JSON object from one log line so that the
//! original fields survive into the scaled output untouched. Typed access to
//! the detection arrays happens lazily through the accessor methods, which is
//! where schema problems surface.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DebugRecordError, Result};

/// Key under which scaled detections are attached to a record.
pub const OBJECTS_KEY: &str = "objects";

/// One line of a debug inference log.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    /// Position of the record in the log (0-based, blank lines excluded)
    pub index: usize,
    /// Line number in the log file (1-based)
    pub line: usize,
    fields: Map<String, Value>,
}

impl DetectionRecord {
    pub fn new(index: usize, line: usize, fields: Map<String, Value>) -> Self {
        Self {
            index,
            line,
            fields,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Path of the frame this record was inferred on, if present and a string.
    pub fn image_file(&self) -> Option<&str> {
        self.fields.get("image_file").and_then(Value::as_str)
    }

    /// Normalized `[x1, y1, x2, y2]` boxes. An absent or null key is an empty list.
    pub fn bboxes(&self) -> Result<Vec<[f64; 4]>> {
        self.typed_list("bboxes", self.fields.get("bboxes"))
    }

    /// Class labels, positionally aligned with `bboxes`.
    pub fn labels(&self) -> Result<Vec<String>> {
        self.typed_list("labels", self.fields.get("labels"))
    }

    /// Confidence values from `vals.confs`, positionally aligned with `bboxes`.
    pub fn confs(&self) -> Result<Vec<f64>> {
        let confs = match self.fields.get("vals") {
            None | Some(Value::Null) => None,
            Some(Value::Object(vals)) => vals.get("confs"),
            Some(other) => {
                return Err(self.schema_error("vals", format!("expected an object, got {other}")))
            }
        };
        self.typed_list("vals.confs", confs)
    }

    fn typed_list<T: DeserializeOwned>(
        &self,
        field: &'static str,
        value: Option<&Value>,
    ) -> Result<Vec<T>> {
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| self.schema_error(field, e.to_string())),
        }
    }

    fn schema_error(&self, field: &'static str, reason: String) -> DebugRecordError {
        DebugRecordError::Schema {
            record: self.index,
            line: self.line,
            field,
            reason,
        }
    }
}

impl Serialize for DetectionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// A detection converted to absolute pixel coordinates.
///
/// Coordinates are truncated toward zero from `normalized * dimension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
    pub conf: f64,
    #[serde(rename = "class")]
    pub class_name: String,
}

/// A record together with its freshly derived pixel boxes.
///
/// Serializes as the original JSON object with an `objects` key; any
/// `objects` key already present in the source line is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledRecord {
    pub record: DetectionRecord,
    pub objects: Vec<ScaledBox>,
}

impl Serialize for ScaledRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.record.fields();
        let carried = fields.keys().filter(|k| k.as_str() != OBJECTS_KEY).count();
        let mut map = serializer.serialize_map(Some(carried + 1))?;
        for (key, value) in fields {
            if key != OBJECTS_KEY {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(OBJECTS_KEY, &self.objects)?;
        map.end()
    }
}
