use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use crate::config::{StatsConfig, StatsFormat};
use crate::dimensions::ImageDimensions;
use crate::metadata::InputProcessing;
use crate::output_manager::{OutputManager, STATS_SUFFIX};
use crate::pipeline::DebugRecordLog;
use crate::processing::{run_log_processing, LogProcessor, LogResult};
use crate::report::{render_table, StatsDocument};
use crate::scaler::SkippedRecord;
use crate::tally::BatchSummary;

#[derive(Debug, Serialize)]
pub struct StatsResult {
    #[serde(flatten)]
    pub summary: BatchSummary,
    pub skipped: Vec<SkippedRecord>,
    #[serde(skip)]
    pub dimensions: Option<ImageDimensions>,
    #[serde(skip)]
    pub processing_time_ms: f64,
}

impl LogResult for StatsResult {
    fn result_summary(&self) -> String {
        format!(
            "{} frame(s), {} object(s) across {} class(es)",
            self.summary.frames,
            self.summary.objects,
            self.summary.classes.len()
        )
    }

    fn processing_time_ms(&self) -> f64 {
        self.processing_time_ms
    }

    fn core_results(&self) -> Result<toml::Value> {
        Ok(toml::Value::try_from(&self.summary)?)
    }

    fn input_processing(&self, log_path: &Path, strict: bool) -> InputProcessing {
        InputProcessing {
            log_path: log_path.to_string_lossy().to_string(),
            strict_mode: strict,
            records: self.summary.frames + self.skipped.len(),
            image_width: self.dimensions.map(|d| d.width),
            image_height: self.dimensions.map(|d| d.height),
        }
    }
}

pub struct StatsProcessor;

impl LogProcessor for StatsProcessor {
    type Config = StatsConfig;
    type Result = StatsResult;
    type Context = ();

    fn prepare(_config: &StatsConfig) -> Result<()> {
        Ok(())
    }

    fn process_log(_context: &(), log_path: &Path, config: &StatsConfig) -> Result<StatsResult> {
        let start = Instant::now();
        let batch = DebugRecordLog::load(log_path)?.scale(config.mismatch_policy)?;

        let result = StatsResult {
            summary: batch.summary(),
            skipped: batch.skipped,
            dimensions: batch.dimensions,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        };

        if config.save {
            let path = OutputManager::new(config, log_path)
                .generate_auxiliary_output(STATS_SUFFIX, "json")?;
            let json = serde_json::to_string_pretty(&result)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::debug!("Wrote statistics to {}", path.display());
        }

        Ok(result)
    }
}

/// Tally every collected log, print the statistics and return the combined summary
pub fn run_stats(config: StatsConfig) -> Result<BatchSummary> {
    let outcome = run_log_processing::<StatsProcessor>(&config)?;

    let mut total = BatchSummary::default();
    for (_, result) in &outcome.results {
        total.merge(&result.summary);
    }

    let rendered = match config.format {
        StatsFormat::Table => {
            let mut out = String::new();
            if config.per_log {
                for (path, result) in &outcome.results {
                    out.push_str(&format!("== {}\n", path.display()));
                    out.push_str(&render_table(&result.summary));
                    out.push('\n');
                }
                out.push_str("== total\n");
            }
            out.push_str(&render_table(&total));
            out
        }
        StatsFormat::Json => {
            let logs = config.per_log.then(|| {
                outcome
                    .results
                    .iter()
                    .map(|(path, result)| (path.display().to_string(), &result.summary))
                    .collect::<BTreeMap<_, _>>()
            });
            let document = StatsDocument {
                logs,
                total: &total,
            };
            let mut json = serde_json::to_string_pretty(&document)?;
            json.push('\n');
            json
        }
    };
    print!("{rendered}");

    Ok(total)
}
