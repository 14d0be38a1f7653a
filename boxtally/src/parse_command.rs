use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use crate::config::ParseConfig;
use crate::dimensions::ImageDimensions;
use crate::metadata::InputProcessing;
use crate::output_manager::{make_path_relative_to_toml, OutputManager, SCALED_SUFFIX};
use crate::pipeline::DebugRecordLog;
use crate::processing::{run_log_processing, LogProcessor, LogResult};

#[derive(Debug, Serialize)]
pub struct ParseResult {
    pub records: usize,
    pub objects: usize,
    pub skipped: usize,
    #[serde(skip)]
    pub dimensions: Option<ImageDimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    pub processing_time_ms: f64,
}

impl LogResult for ParseResult {
    fn result_summary(&self) -> String {
        format!(
            "{} record(s), {} object(s), {} skipped",
            self.records, self.objects, self.skipped
        )
    }

    fn processing_time_ms(&self) -> f64 {
        self.processing_time_ms
    }

    fn core_results(&self) -> Result<toml::Value> {
        Ok(toml::Value::try_from(self)?)
    }

    fn input_processing(&self, log_path: &Path, strict: bool) -> InputProcessing {
        InputProcessing {
            log_path: log_path.to_string_lossy().to_string(),
            strict_mode: strict,
            records: self.records + self.skipped,
            image_width: self.dimensions.map(|d| d.width),
            image_height: self.dimensions.map(|d| d.height),
        }
    }
}

pub struct ParseProcessor;

impl LogProcessor for ParseProcessor {
    type Config = ParseConfig;
    type Result = ParseResult;
    type Context = ();

    fn prepare(_config: &ParseConfig) -> Result<()> {
        Ok(())
    }

    fn process_log(_context: &(), log_path: &Path, config: &ParseConfig) -> Result<ParseResult> {
        let start = Instant::now();
        let batch = DebugRecordLog::load(log_path)?.scale(config.mismatch_policy)?;
        let ndjson = batch.to_ndjson()?;

        let output_path = if config.stdout {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(ndjson.as_bytes())?;
            handle.flush()?;
            None
        } else {
            let output_manager = OutputManager::new(config, log_path);
            let path = output_manager.generate_main_output_path(SCALED_SUFFIX, "json")?;
            std::fs::write(&path, ndjson)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::debug!("Wrote scaled records to {}", path.display());

            let relative = if config.base.skip_metadata {
                path.to_string_lossy().to_string()
            } else {
                make_path_relative_to_toml(&path, &output_manager.metadata_path()?)
            };
            Some(relative)
        };

        Ok(ParseResult {
            records: batch.records.len(),
            objects: batch.records.iter().map(|r| r.objects.len()).sum(),
            skipped: batch.skipped.len(),
            dimensions: batch.dimensions,
            output_path,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

/// Scale every collected log and write the results; returns the number of logs processed
pub fn run_parse(config: ParseConfig) -> Result<usize> {
    let outcome = run_log_processing::<ParseProcessor>(&config)?;
    Ok(outcome.results.len())
}
