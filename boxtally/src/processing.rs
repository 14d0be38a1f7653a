//! Processing framework shared by all commands.
//!
//! `LogProcessor` is implemented once per command; `run_log_processing` owns
//! source collection, the per-log loop, strict/permissive failure handling and
//! metadata writing.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::color_utils::symbols;
use crate::config::ToolConfig;
use crate::log_input::{collect_logs_from_sources, LogInputConfig};
use crate::metadata::{
    collect_boxtally_env_vars, load_or_create_metadata, save_metadata, ExecutionContext,
    InputProcessing, ToolSections,
};
use crate::output_manager::{check_output_collisions, OutputManager};

/// Result of processing one log
pub trait LogResult {
    /// Human-readable one-liner for logging
    fn result_summary(&self) -> String;

    fn processing_time_ms(&self) -> f64;

    /// Serializable core results for the metadata section
    fn core_results(&self) -> Result<toml::Value>;

    /// Input description for the metadata section
    fn input_processing(&self, log_path: &Path, strict: bool) -> InputProcessing;
}

pub trait LogProcessor {
    type Config: ToolConfig + Serialize;
    type Result: LogResult;
    /// State built once per run and shared by every log
    type Context;

    fn prepare(config: &Self::Config) -> Result<Self::Context>;

    fn process_log(
        context: &Self::Context,
        log_path: &Path,
        config: &Self::Config,
    ) -> Result<Self::Result>;
}

/// Per-log results of a run, in processing order
pub struct ProcessingOutcome<R> {
    pub results: Vec<(PathBuf, R)>,
    pub failed: usize,
}

pub fn run_log_processing<P: LogProcessor>(
    config: &P::Config,
) -> Result<ProcessingOutcome<P::Result>> {
    let framework_start = Instant::now();
    let start_timestamp = Utc::now();
    let command_line: Vec<String> = std::env::args().collect();

    let input_config = LogInputConfig::from_strict_flag(config.base().strict);
    let logs = collect_logs_from_sources(&config.base().sources, &input_config)?;

    let mut outcome = ProcessingOutcome {
        results: Vec::new(),
        failed: 0,
    };

    if logs.is_empty() {
        log::warn!("{}No debug logs found to process", symbols::warning());
        return Ok(outcome);
    }

    log::info!(
        "{}Found {} debug log(s) to process",
        symbols::resources_found(),
        logs.len()
    );

    check_output_collisions(config, &logs)?;
    let context = P::prepare(config)?;

    for (index, log_path) in logs.iter().enumerate() {
        match P::process_log(&context, log_path, config) {
            Ok(result) => {
                log::info!(
                    "{}Processed {} ({}/{}) in {:.1}ms",
                    symbols::completed_successfully(),
                    log_path.display(),
                    index + 1,
                    logs.len(),
                    result.processing_time_ms()
                );
                log::debug!("{}", result.result_summary());

                if !config.base().skip_metadata {
                    save_metadata_for_log::<P>(
                        &result,
                        config,
                        log_path,
                        &command_line,
                        start_timestamp,
                    )?;
                }
                outcome.results.push((log_path.clone(), result));
            }
            Err(e) => {
                outcome.failed += 1;
                if config.base().strict {
                    return Err(e.context(format!("Failed to process {}", log_path.display())));
                }
                log::warn!(
                    "{}Failed to process {} ({}/{}): {:#}",
                    symbols::warning(),
                    log_path.display(),
                    index + 1,
                    logs.len(),
                    e
                );
            }
        }
    }

    let total_time = framework_start.elapsed();
    if outcome.failed == 0 {
        log::info!(
            "{}Processed {} log(s) in {:.1}s",
            symbols::completed_successfully(),
            outcome.results.len(),
            total_time.as_secs_f64()
        );
    } else {
        log::warn!(
            "{}{} of {} log(s) failed to process",
            symbols::completed_partially_successfully(),
            outcome.failed,
            logs.len()
        );
    }

    Ok(outcome)
}

fn save_metadata_for_log<P: LogProcessor>(
    result: &P::Result,
    config: &P::Config,
    log_path: &Path,
    command_line: &[String],
    start_timestamp: chrono::DateTime<Utc>,
) -> Result<()> {
    let output_manager = OutputManager::new(config, log_path);
    let metadata_path = output_manager.metadata_path()?;

    let execution = ExecutionContext {
        timestamp: Some(start_timestamp),
        boxtally_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        command_line: Some(command_line.to_vec()),
        exit_code: Some(0),
        processing_time_ms: Some(result.processing_time_ms()),
        boxtally_env_vars: collect_boxtally_env_vars(),
    };

    let sections = ToolSections {
        core: Some(result.core_results()?),
        config: Some(toml::Value::try_from(config)?),
        execution: Some(execution),
        input: Some(result.input_processing(log_path, config.base().strict)),
    };

    let mut metadata = load_or_create_metadata(&metadata_path)?;
    metadata.set_section(config.tool_name(), sections)?;
    save_metadata(&metadata, &metadata_path)?;

    log::debug!("Saved metadata to: {}", metadata_path.display());
    Ok(())
}
