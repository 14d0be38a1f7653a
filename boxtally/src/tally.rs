//! Per-class occurrence counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::ScaledRecord;

/// Mapping from class label to number of detections carrying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassTally(BTreeMap<String, usize>);

impl ClassTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, class_name: &str, count: usize) {
        *self.0.entry(class_name.to_string()).or_default() += count;
    }

    pub fn get(&self, class_name: &str) -> usize {
        self.0.get(class_name).copied().unwrap_or(0)
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: &ClassTally) {
        for (class_name, count) in &other.0 {
            self.add(class_name, *count);
        }
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries ordered by count, highest first; ties by label.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }
}

impl FromIterator<(String, usize)> for ClassTally {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        let mut tally = ClassTally::new();
        for (class_name, count) in iter {
            tally.add(&class_name, count);
        }
        tally
    }
}

/// Count detections per class across all records.
pub fn tally_classes(records: &[ScaledRecord]) -> ClassTally {
    let mut tally = ClassTally::new();
    for object in records.iter().flat_map(|r| &r.objects) {
        tally.add(&object.class_name, 1);
    }
    tally
}

/// Frame and object counts alongside the class tally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub frames: usize,
    pub objects: usize,
    pub classes: ClassTally,
}

impl BatchSummary {
    pub fn from_records(records: &[ScaledRecord]) -> Self {
        Self {
            frames: records.len(),
            objects: records.iter().map(|r| r.objects.len()).sum(),
            classes: tally_classes(records),
        }
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.frames += other.frames;
        self.objects += other.objects;
        self.classes.merge(&other.classes);
    }
}
