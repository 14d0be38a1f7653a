//! Text and JSON rendering of class statistics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::tally::BatchSummary;

const BAR_WIDTH: usize = 40;

/// Ranked table of class counts with a proportional bar per class.
///
/// ```text
/// class      count
/// cardboard      5  ########################################
/// pet            2  ################
/// ```
pub fn render_table(summary: &BatchSummary) -> String {
    let mut out = String::new();
    let ranked = summary.classes.ranked();

    let _ = writeln!(
        out,
        "{} frame(s), {} object(s), {} class(es)",
        summary.frames,
        summary.objects,
        ranked.len()
    );
    if ranked.is_empty() {
        return out;
    }

    let name_width = ranked
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("class".len());
    let max_count = ranked.first().map(|(_, count)| *count).unwrap_or(0);
    let count_width = max_count.to_string().len().max("count".len());

    let _ = writeln!(out, "{:<name_width$}  {:>count_width$}", "class", "count");
    for (name, count) in ranked {
        let _ = writeln!(
            out,
            "{name:<name_width$}  {count:>count_width$}  {}",
            "#".repeat(bar_length(count, max_count))
        );
    }
    out
}

fn bar_length(count: usize, max_count: usize) -> usize {
    if max_count == 0 {
        return 0;
    }
    // At least one mark for any non-zero count
    ((count * BAR_WIDTH) / max_count).max(usize::from(count > 0))
}

/// JSON document printed by `stats --format json`
#[derive(Debug, Serialize)]
pub struct StatsDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<BTreeMap<String, &'a BatchSummary>>,
    pub total: &'a BatchSummary,
}
