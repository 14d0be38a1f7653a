use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

use crate::config::ReplayConfig;
use crate::metadata::InputProcessing;
use crate::processing::{run_log_processing, LogProcessor, LogResult};
use crate::replay::{replay_log, FrameStyle, ReplaySummary};

#[derive(Debug, Serialize)]
pub struct ReplayResult {
    #[serde(flatten)]
    pub summary: ReplaySummary,
    #[serde(skip)]
    pub processing_time_ms: f64,
}

impl LogResult for ReplayResult {
    fn result_summary(&self) -> String {
        format!(
            "{} frame(s) written, {} record(s) without a frame, {} skipped",
            self.summary.frames_written,
            self.summary.records_without_image,
            self.summary.records_skipped
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
            records: self.summary.frames_written
                + self.summary.records_without_image
                + self.summary.records_skipped,
            image_width: None,
            image_height: None,
        }
    }
}

pub struct ReplayProcessor;

impl LogProcessor for ReplayProcessor {
    type Config = ReplayConfig;
    type Result = ReplayResult;
    type Context = FrameStyle;

    fn prepare(config: &ReplayConfig) -> Result<FrameStyle> {
        let style = FrameStyle {
            thickness: config.thickness,
            min_confidence: config.min_confidence,
            font: None,
        };
        match &config.font {
            Some(font_path) => style.with_font_file(Path::new(font_path)),
            None => Ok(style),
        }
    }

    fn process_log(
        style: &FrameStyle,
        log_path: &Path,
        config: &ReplayConfig,
    ) -> Result<ReplayResult> {
        let start = Instant::now();
        let summary = replay_log(
            log_path,
            config.images.as_deref().map(Path::new),
            config.base.output_dir.as_deref().map(Path::new),
            style,
        )?;

        Ok(ReplayResult {
            summary,
            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

/// Redraw detections for every collected log; returns the number of frames written
pub fn run_replay(config: ReplayConfig) -> Result<usize> {
    let outcome = run_log_processing::<ReplayProcessor>(&config)?;
    Ok(outcome
        .results
        .iter()
        .map(|(_, result)| result.summary.frames_written)
        .sum())
}
